//! Index Store
//!
//! Replay, append and rewrite of the on-disk index log.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{DriftError, Result};
use crate::record::{decode_index_header, encode_index_entry, index_entry_len, HEADER_SIZE};

use super::Index;

/// Persistence of the key → offset index
pub struct IndexStore;

/// Result of replaying an index log
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries decoded from the log (including superseded ones)
    pub entries_replayed: u64,

    /// Entries skipped because they point past the end of the data log
    pub entries_dropped: u64,

    /// Length of the valid prefix of the log
    pub valid_len: u64,

    /// Bytes of a torn trailing entry (0 for a clean log)
    pub truncated_bytes: u64,
}

impl IndexStore {
    /// Load the index from `path`.
    ///
    /// A missing or unreadable log yields an empty index (first run).
    pub fn load(path: &Path) -> Result<Index> {
        Self::replay(path, u64::MAX).map(|(index, _)| index)
    }

    /// Replay the log from offset 0 to EOF, keeping the last offset per key.
    ///
    /// Entries whose record header would not fit in a data log of
    /// `data_len` bytes are dropped. A torn trailing entry ends the replay.
    pub fn replay(path: &Path, data_len: u64) -> Result<(Index, ReplayStats)> {
        let mut index = Index::new();
        let mut stats = ReplayStats::default();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Index log {} unreadable ({}), starting with an empty index",
                        path.display(),
                        e
                    );
                }
                return Ok((index, stats));
            }
        };

        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut pos: u64 = 0;

        while pos < file_len {
            if file_len - pos < HEADER_SIZE as u64 {
                break;
            }

            let mut header = [0u8; HEADER_SIZE];
            reader.read_exact(&mut header)?;
            let (key_len, offset) = decode_index_header(&header);

            let entry_len = index_entry_len(key_len)?;
            if entry_len > file_len - pos {
                break;
            }

            let mut key = vec![0u8; key_len as usize];
            reader.read_exact(&mut key)?;
            pos += entry_len;
            stats.entries_replayed += 1;

            if offset.saturating_add(HEADER_SIZE as u64) > data_len {
                stats.entries_dropped += 1;
                continue;
            }

            index.insert(key, offset);
        }

        stats.valid_len = pos;
        stats.truncated_bytes = file_len - pos;

        if stats.truncated_bytes > 0 {
            tracing::warn!(
                "Index log {} ends with a torn entry ({} bytes ignored)",
                path.display(),
                stats.truncated_bytes
            );
        }
        if stats.entries_dropped > 0 {
            tracing::warn!(
                "Index log {}: {} entries point past the data log and were dropped",
                path.display(),
                stats.entries_dropped
            );
        }

        Ok((index, stats))
    }

    /// Replay the log and cut off a torn trailing entry so later appends
    /// start on an entry boundary.
    pub fn recover(path: &Path, data_len: u64) -> Result<(Index, ReplayStats)> {
        let (index, stats) = Self::replay(path, data_len)?;

        if stats.truncated_bytes > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(stats.valid_len)?;
            file.sync_all()?;
        }

        Ok((index, stats))
    }

    /// Append one segment of entries to the log.
    ///
    /// Existing bytes are never touched. Failures surface as
    /// [`DriftError::StorageUnavailable`].
    pub fn append(entries: &[(Vec<u8>, u64)], path: &Path, sync: bool) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let unavailable = |e: io::Error| {
            DriftError::StorageUnavailable(format!(
                "index log {}: {}",
                path.display(),
                e
            ))
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(unavailable)?;

        let mut writer = BufWriter::new(file);
        for (key, offset) in entries {
            writer
                .write_all(&encode_index_entry(key, *offset))
                .map_err(unavailable)?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| unavailable(e.into_error()))?;

        if sync {
            file.sync_data().map_err(unavailable)?;
        }

        Ok(())
    }

    /// Write a brand-new log at `path` holding exactly `entries`.
    ///
    /// Used by compaction on a temporary path; the caller renames the result
    /// over the live log. Returns the size of the new file.
    pub fn rewrite(entries: &[(Vec<u8>, u64)], path: &Path) -> Result<u64> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        let mut written: u64 = 0;
        for (key, offset) in entries {
            let bytes = encode_index_entry(key, *offset);
            writer.write_all(&bytes)?;
            written += bytes.len() as u64;
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(written)
    }
}
