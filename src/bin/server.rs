//! DriftKV Server Binary
//!
//! Starts the TCP server and the background compactor for DriftKV.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use driftkv::network::Server;
use driftkv::{CompactionScheduler, Config, Engine, KvStore};
use tracing_subscriber::{fmt, EnvFilter};

/// DriftKV Server
#[derive(Parser, Debug)]
#[command(name = "driftkv-server")]
#[command(about = "Persistent key-value store with log compaction")]
#[command(version)]
struct Args {
    /// Data log file
    #[arg(long, default_value = "./data.db")]
    data_file: PathBuf,

    /// Index log file
    #[arg(long, default_value = "./indexes.idx")]
    index_file: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:56379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// MemTable entries before a flush
    #[arg(short, long, default_value = "1000")]
    flush_threshold: usize,

    /// Index segments before compaction is triggered (0 = interval only)
    #[arg(long, default_value = "10000")]
    max_index_segments: usize,

    /// Seconds between scheduled compactions
    #[arg(long, default_value = "86400")]
    compaction_interval_secs: u64,

    /// Skip fsync at the end of each flush
    #[arg(long)]
    no_sync: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("DriftKV Server v{}", driftkv::VERSION);
    tracing::info!("Data log: {}", args.data_file.display());
    tracing::info!("Index log: {}", args.index_file.display());
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_path(args.data_file)
        .index_path(args.index_file)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .flush_threshold(args.flush_threshold)
        .max_index_segments(args.max_index_segments)
        .compaction_interval(Duration::from_secs(args.compaction_interval_secs.max(1)))
        .sync_on_flush(!args.no_sync)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let scheduler = match CompactionScheduler::from_config(Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start compaction scheduler: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn KvStore> = engine.clone();
    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let result = server.run();

    scheduler.shutdown();
    if let Err(e) = engine.close() {
        tracing::error!("Final flush failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
