//! Compaction
//!
//! Rewrites the data and index logs so they hold only live records.
//!
//! ## Algorithm (read-compact)
//! 1. Snapshot the index keys
//! 2. `get` each key; live values go to `compacted_<data>` with fresh offsets
//! 3. Write `compacted_<index>` for those offsets, fsync both
//! 4. Under the write lock: rename data, swap the in-memory state, rename
//!    index, flush writes that arrived meanwhile into the new files
//!
//! A failed index rename stays pending in the engine state and is retried
//! before every later index append.
//!
//! ## Crash Matrix
//! | temp data | temp index | meaning on open                 |
//! |-----------|------------|---------------------------------|
//! | present   | any        | swap never started: discard     |
//! | absent    | present    | data renamed: finish index swap |
//! | absent    | absent     | nothing to do                   |

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::{DriftError, Result};
use crate::index::{Index, IndexStore};
use crate::storage::DataFile;

use super::{Engine, EngineState};

/// Live records buffered before each append to the compacted data log
const COMPACTION_BATCH: usize = 1024;

/// Clears the compaction flag however the run ends
struct CompactingGuard<'a>(&'a AtomicBool);

impl Drop for CompactingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Engine {
    /// Compact the data and index logs.
    ///
    /// Returns `Ok(false)` without doing anything when another compaction is
    /// already running or the engine is closed.
    pub fn compact(&self) -> Result<bool> {
        if self
            .compacting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Compaction already running, skipping");
            return Ok(false);
        }
        let _flag = CompactingGuard(&self.compacting);
        let _gate = self.compaction_gate.lock();

        if self.closed.load(Ordering::Acquire) {
            return Ok(false);
        }

        let started = Instant::now();
        let before = self.stats();
        let keys: Vec<Vec<u8>> = self.state.read().index.keys().cloned().collect();

        let data_tmp = compacted_path(&self.config.data_path);
        let index_tmp = compacted_path(&self.config.index_path);

        let (index, data) = match self.write_compacted(&keys, &data_tmp, &index_tmp) {
            Ok(output) => output,
            Err(e) => {
                let _ = fs::remove_file(&data_tmp);
                let _ = fs::remove_file(&index_tmp);
                return Err(e);
            }
        };

        {
            let mut state = self.state.write();

            // Until the data rename succeeds the live files are untouched
            let data = match data.persist_as(&self.config.data_path) {
                Ok(data) => data,
                Err(e) => {
                    let _ = fs::remove_file(&data_tmp);
                    let _ = fs::remove_file(&index_tmp);
                    return Err(e);
                }
            };

            // The new data log is live: memory must follow it even if the
            // index rename below fails. Flushes retry that rename first.
            state.data = data;
            state.index = index;
            state.segments_since_compaction = 0;
            state.pending_index_swap = Some(index_tmp);

            self.complete_index_swap(&mut state)?;
            self.flush_locked(&mut state)?;
        }

        let after = self.stats();
        tracing::info!(
            "Compaction finished in {:?}: {} keys scanned, {} live; data {} -> {} bytes, index {} -> {} bytes",
            started.elapsed(),
            keys.len(),
            after.index_entries,
            before.data_file_bytes,
            after.data_file_bytes,
            before.index_file_bytes,
            after.index_file_bytes
        );

        Ok(true)
    }

    /// Write live records to the temp logs and return the index for them
    /// along with the temp data log
    fn write_compacted(
        &self,
        keys: &[Vec<u8>],
        data_tmp: &Path,
        index_tmp: &Path,
    ) -> Result<(Index, DataFile)> {
        File::create(data_tmp)?;
        let mut data = DataFile::open(data_tmp)?;

        let mut entries: Vec<(Vec<u8>, u64)> = Vec::with_capacity(keys.len());
        let mut batch: Vec<(&[u8], Vec<u8>)> = Vec::with_capacity(COMPACTION_BATCH);

        for key in keys {
            if let Some(value) = self.get(key)? {
                batch.push((key.as_slice(), value));
            }
            if batch.len() == COMPACTION_BATCH {
                append_batch(&mut data, &mut batch, &mut entries)?;
            }
        }
        append_batch(&mut data, &mut batch, &mut entries)?;
        data.sync()?;

        IndexStore::rewrite(&entries, index_tmp)?;

        Ok((entries.into_iter().collect(), data))
    }

    /// Move a compacted index log left by a failed rename into place.
    ///
    /// Fails with [`DriftError::StorageUnavailable`] while the rename keeps
    /// failing, so nothing is appended to the stale index log.
    pub(super) fn complete_index_swap(&self, state: &mut EngineState) -> Result<()> {
        let index_tmp = match state.pending_index_swap.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };

        if let Err(e) = fs::rename(index_tmp, &self.config.index_path) {
            tracing::error!(
                "Index swap {} -> {} failed: {}",
                index_tmp.display(),
                self.config.index_path.display(),
                e
            );
            return Err(DriftError::StorageUnavailable(format!(
                "index log {}: {}",
                self.config.index_path.display(),
                e
            )));
        }

        state.pending_index_swap = None;
        sync_parent_dir(&self.config.index_path)?;
        Ok(())
    }
}

fn append_batch(
    data: &mut DataFile,
    batch: &mut Vec<(&[u8], Vec<u8>)>,
    entries: &mut Vec<(Vec<u8>, u64)>,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let offsets = data.append(batch.as_slice(), false)?;
    entries.extend(batch.iter().zip(offsets).map(|((key, _), offset)| (key.to_vec(), offset)));
    batch.clear();
    Ok(())
}

/// `dir/compacted_<name>` next to `path`
pub(super) fn compacted_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("compacted_{}", name))
}

/// Finish or discard a compaction swap interrupted by a crash
pub(super) fn recover_interrupted_swap(data_path: &Path, index_path: &Path) -> Result<()> {
    let data_tmp = compacted_path(data_path);
    let index_tmp = compacted_path(index_path);

    if data_tmp.exists() {
        tracing::warn!(
            "Discarding unfinished compaction output {}",
            data_tmp.display()
        );
        fs::remove_file(&data_tmp)?;
        remove_if_exists(&index_tmp)?;
    } else if index_tmp.exists() {
        tracing::warn!(
            "Completing interrupted compaction: {} -> {}",
            index_tmp.display(),
            index_path.display()
        );
        fs::rename(&index_tmp, index_path)?;
        sync_parent_dir(index_path)?;
    }

    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => File::open(dir)?.sync_all(),
        None => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
