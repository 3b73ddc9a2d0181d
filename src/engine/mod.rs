//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate MemTable, index and data log
//! - Handle concurrent read/write access
//! - Flush the MemTable when it reaches the entry threshold
//! - Compact the logs down to live records
//! - Rebuild the index on startup

mod compaction;
mod scheduler;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::index::{Index, IndexStore};
use crate::memtable::{MemTable, MemTableEntry};
use crate::record::is_tombstone;
use crate::storage::DataFile;

pub use scheduler::CompactionScheduler;

/// State guarded by the engine's single reader-writer lock
struct EngineState {
    /// Unflushed writes; shadows the index
    memtable: MemTable,

    /// key → offset of the latest flushed record
    index: Index,

    /// Data log and its append cursor
    data: DataFile,

    /// Index segments appended since the last compaction
    segments_since_compaction: usize,

    /// Compacted index log whose rename over the live one failed.
    /// The in-memory index already describes it.
    pending_index_swap: Option<PathBuf>,
}

/// Point-in-time counters for monitoring and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub memtable_entries: usize,
    pub memtable_bytes: usize,
    pub index_entries: usize,
    pub data_file_bytes: u64,
    pub index_file_bytes: u64,
    pub segments_since_compaction: usize,
    pub compacting: bool,
}

/// The main storage engine
///
/// ## Concurrency Model: one reader-writer lock
///
/// - **Reads** (get): shared lock over {memtable, index, cursor}
/// - **Writes** (set/delete/flush): exclusive lock; an automatic flush runs
///   inside the same critical section
/// - **Compaction**: `compacting` flag, never reentrant; scans through the
///   public `get` and takes the exclusive lock only for the file swap
///
/// While `compacting` is set, flushes are deferred and writes stay in the
/// MemTable. The compactor flushes them into the new files at the swap.
pub struct Engine {
    /// Engine configuration
    config: Config,

    state: RwLock<EngineState>,

    /// Lock-free "compaction in progress" flag
    compacting: AtomicBool,

    /// Held for a whole compaction run so `close` can wait it out
    compaction_gate: Mutex<()>,

    closed: AtomicBool,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create parent directories and both log files
    /// 2. Finish or discard an interrupted compaction swap
    /// 3. Position the append cursor at the end of the data log
    /// 4. Replay the index log
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        for path in [&config.data_path, &config.index_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        compaction::recover_interrupted_swap(&config.data_path, &config.index_path)?;

        let data = DataFile::open(&config.data_path)?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.index_path)?;
        let (index, replay) = IndexStore::recover(&config.index_path, data.len())?;

        tracing::info!(
            "Engine opened: data={} ({} bytes), index={} ({} keys from {} entries)",
            config.data_path.display(),
            data.len(),
            config.index_path.display(),
            index.len(),
            replay.entries_replayed
        );

        Ok(Self {
            config,
            state: RwLock::new(EngineState {
                memtable: MemTable::new(),
                index,
                data,
                segments_since_compaction: 0,
                pending_index_swap: None,
            }),
            compacting: AtomicBool::new(false),
            compaction_gate: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with explicit file paths and thresholds (defaults elsewhere)
    pub fn open_paths(
        data_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
        flush_threshold: usize,
        max_index_segments: usize,
    ) -> Result<Self> {
        let config = Config::builder()
            .data_path(data_path.as_ref())
            .index_path(index_path.as_ref())
            .flush_threshold(flush_threshold)
            .max_index_segments(max_index_segments)
            .build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (a tombstone there means deleted)
    /// 2. Index → one record read from the data log
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();

        if let Some(entry) = state.memtable.get(key) {
            return Ok(match entry {
                MemTableEntry::Value(value) => Some(value.clone()),
                MemTableEntry::Tombstone => None,
            });
        }

        let offset = match state.index.get(key) {
            Some(&offset) => offset,
            None => return Ok(None),
        };

        match state.data.read_at(offset)? {
            Some((stored_key, _)) if stored_key != key => Err(DriftError::Corruption(format!(
                "index points key {:?} at offset {} holding a different key",
                String::from_utf8_lossy(key),
                offset
            ))),
            Some((_, value)) if is_tombstone(&value) => Ok(None),
            Some((_, value)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    /// Set a key-value pair
    ///
    /// Returns once the write is in the MemTable and, if it filled the
    /// MemTable, flushed to both logs.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if is_tombstone(value) {
            return Err(DriftError::ReservedValue);
        }
        self.write(key, MemTableEntry::Value(value.to_vec()))
    }

    /// Delete a key by writing a tombstone
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(key, MemTableEntry::Tombstone)
    }

    fn write(&self, key: &[u8], entry: MemTableEntry) -> Result<()> {
        let mut state = self.state.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(DriftError::Closed);
        }

        let entries = match entry {
            MemTableEntry::Value(value) => state.memtable.put(key.to_vec(), value),
            MemTableEntry::Tombstone => state.memtable.delete(key.to_vec()),
        };

        if entries >= self.config.flush_threshold && !self.compacting.load(Ordering::Acquire) {
            self.flush_locked(&mut state)?;
        }

        Ok(())
    }

    /// Flush the MemTable to the data and index logs (SyncToDisk)
    ///
    /// Deferred while a compaction is running.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.write();

        if self.compacting.load(Ordering::Acquire) {
            tracing::debug!(
                "Flush of {} entries deferred until compaction finishes",
                state.memtable.len()
            );
            return Ok(());
        }

        self.flush_locked(&mut state).map(|_| ())
    }

    /// Internal flush implementation (called with the write lock held)
    ///
    /// Data records go first, then the index segment, then the in-memory
    /// index. Any failure leaves the MemTable untouched for a retry.
    fn flush_locked(&self, state: &mut EngineState) -> Result<usize> {
        // Never append to the index log an unfinished compaction left behind
        self.complete_index_swap(state)?;

        if state.memtable.is_empty() {
            return Ok(0);
        }

        let sync = self.config.sync_on_flush;

        let batch: Vec<(&[u8], &[u8])> = state
            .memtable
            .iter()
            .map(|(key, entry)| (key.as_slice(), entry.as_value_bytes()))
            .collect();
        let offsets = state.data.append(&batch, sync)?;

        let pending: Vec<(Vec<u8>, u64)> = batch
            .iter()
            .zip(offsets)
            .map(|((key, _), offset)| (key.to_vec(), offset))
            .collect();

        IndexStore::append(&pending, &self.config.index_path, sync)?;

        let flushed = pending.len();
        for (key, offset) in pending {
            state.index.insert(key, offset);
        }
        state.memtable.clear();
        state.segments_since_compaction += 1;

        tracing::debug!(
            "Flushed {} entries, data log now {} bytes",
            flushed,
            state.data.len()
        );

        Ok(flushed)
    }

    /// Close the engine gracefully
    ///
    /// Waits for a running compaction, then flushes whatever is buffered.
    /// Later writes fail with [`DriftError::Closed`]; reads keep working.
    ///
    /// If the final flush fails the engine stays open, so the caller can
    /// retry `close` without losing the buffered writes.
    pub fn close(&self) -> Result<()> {
        let _gate = self.compaction_gate.lock();
        let mut state = self.state.write();

        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        self.flush_locked(&mut state)?;
        self.closed.store(true, Ordering::Release);
        tracing::info!("Engine closed: {}", self.config.data_path.display());
        Ok(())
    }

    /// Every live key with its value: MemTable overlaid on the index,
    /// tombstones excluded. Taken under one shared lock.
    pub fn live_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let state = self.state.read();
        let mut entries = Vec::with_capacity(state.index.len() + state.memtable.len());

        for (key, &offset) in &state.index {
            if state.memtable.get(key).is_some() {
                continue;
            }
            if let Some((_, value)) = state.data.read_at(offset)? {
                if !is_tombstone(&value) {
                    entries.push((key.clone(), value));
                }
            }
        }

        for (key, entry) in state.memtable.iter() {
            if let MemTableEntry::Value(value) = entry {
                entries.push((key.clone(), value.clone()));
            }
        }

        Ok(entries)
    }

    /// True once enough index segments piled up since the last compaction
    pub fn needs_compaction(&self) -> bool {
        let max = self.config.max_index_segments;
        max > 0 && self.state.read().segments_since_compaction >= max
    }

    pub fn is_compacting(&self) -> bool {
        self.compacting.load(Ordering::Acquire)
    }

    /// Snapshot of the engine's counters
    pub fn stats(&self) -> EngineStats {
        let state = self.state.read();
        EngineStats {
            memtable_entries: state.memtable.len(),
            memtable_bytes: state.memtable.size(),
            index_entries: state.index.len(),
            data_file_bytes: state.data.len(),
            index_file_bytes: fs::metadata(&self.config.index_path)
                .map(|m| m.len())
                .unwrap_or(0),
            segments_since_compaction: state.segments_since_compaction,
            compacting: self.is_compacting(),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_path(&self) -> &Path {
        &self.config.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.config.index_path
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.state.read().memtable.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            if let Err(e) = self.close() {
                tracing::warn!("Flush on drop failed: {}", e);
            }
        }
    }
}
