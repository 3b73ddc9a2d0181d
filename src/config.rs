//! Configuration for DriftKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DriftError, Result};

/// Main configuration for a DriftKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Append-only data log (records)
    pub data_path: PathBuf,

    /// Append-only index log (key → offset entries)
    pub index_path: PathBuf,

    /// fsync the data and index logs at the end of every flush
    pub sync_on_flush: bool,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of memtable entries that triggers a flush
    pub flush_threshold: usize,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Index segments (one per flush) accumulated before the scheduler
    /// compacts on its own. 0 disables the segment trigger.
    pub max_index_segments: usize,

    /// Fixed interval between scheduled compactions
    pub compaction_interval: Duration,

    /// How often the scheduler checks the segment trigger
    pub compaction_poll_interval: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data.db"),
            index_path: PathBuf::from("./indexes.idx"),
            sync_on_flush: true,
            flush_threshold: 1000,
            max_index_segments: 10_000,
            compaction_interval: Duration::from_secs(24 * 60 * 60),
            compaction_poll_interval: Duration::from_secs(1),
            listen_addr: "127.0.0.1:56379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(DriftError::Config(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if self.data_path == self.index_path {
            return Err(DriftError::Config(format!(
                "data and index logs must be different files (both {})",
                self.data_path.display()
            )));
        }
        if self.compaction_poll_interval.is_zero() {
            return Err(DriftError::Config(
                "compaction_poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data log path
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_path = path.into();
        self
    }

    /// Set the index log path
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Place both logs in `dir` using the default file names
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.config.data_path = dir.join("data.db");
        self.config.index_path = dir.join("indexes.idx");
        self
    }

    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.config.sync_on_flush = sync;
        self
    }

    /// Set the memtable entry count that triggers a flush
    pub fn flush_threshold(mut self, entries: usize) -> Self {
        self.config.flush_threshold = entries;
        self
    }

    pub fn max_index_segments(mut self, segments: usize) -> Self {
        self.config.max_index_segments = segments;
        self
    }

    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_interval = interval;
        self
    }

    pub fn compaction_poll_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_poll_interval = interval;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
