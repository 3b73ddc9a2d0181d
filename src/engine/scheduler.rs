//! Compaction scheduler
//!
//! Background thread that compacts on a fixed interval and whenever the
//! engine reports too many index segments.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::Result;

use super::Engine;

/// Handle on the background compaction thread
///
/// Dropping the handle stops the thread and waits for it; a compaction that
/// is already running finishes first.
pub struct CompactionScheduler {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CompactionScheduler {
    /// Start with the intervals from the engine's config
    pub fn from_config(engine: Arc<Engine>) -> Result<Self> {
        let interval = engine.config().compaction_interval;
        let poll = engine.config().compaction_poll_interval;
        Self::start(engine, interval, poll)
    }

    /// Spawn the scheduler thread
    ///
    /// - every `interval`: compact unconditionally
    /// - every `poll`: compact if [`Engine::needs_compaction`]
    pub fn start(engine: Arc<Engine>, interval: Duration, poll: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let handle = thread::Builder::new()
            .name("driftkv-compactor".to_string())
            .spawn(move || run(engine, interval, poll, shutdown_rx))?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.shutdown_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Compaction scheduler thread panicked");
            }
        }
    }
}

impl Drop for CompactionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(engine: Arc<Engine>, interval: Duration, poll: Duration, shutdown: Receiver<()>) {
    let interval_tick = channel::tick(interval);
    let poll_tick = channel::tick(poll);

    tracing::debug!(
        "Compaction scheduler started (interval {:?}, poll {:?})",
        interval,
        poll
    );

    loop {
        crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(interval_tick) -> _ => compact(&engine, "interval"),
            recv(poll_tick) -> _ => {
                if engine.needs_compaction() {
                    compact(&engine, "segment threshold");
                }
            }
        }
    }

    tracing::debug!("Compaction scheduler stopped");
}

fn compact(engine: &Engine, reason: &str) {
    tracing::info!("Starting compaction ({})", reason);
    match engine.compact() {
        Ok(true) => {}
        Ok(false) => tracing::debug!("Compaction skipped ({})", reason),
        Err(e) => tracing::error!("Compaction failed ({}): {}", reason, e),
    }
}
