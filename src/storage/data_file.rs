//! Data log file
//!
//! Append cursor plus positional record reads.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{DriftError, Result};
use crate::record::{decode_record_body, decode_record_header, encode_record, record_len, HEADER_SIZE};

/// Handle on the append-only data log
///
/// Holds no open file descriptor: appends and reads open the file on demand,
/// so a compaction swap never leaves a handle on an unlinked file.
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
    /// Append cursor == current length of the file
    len: u64,
}

impl DataFile {
    /// Open or create the data log; the cursor starts at end of file
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            len,
        })
    }

    /// Append records in order, returning the offset of each record header.
    ///
    /// Offsets are taken from the file's actual end, so bytes left behind by
    /// an earlier failed append never shift them.
    pub fn append<K, V>(&mut self, records: &[(K, V)], sync: bool) -> Result<Vec<u64>>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        match self.append_inner(records, sync) {
            Ok(offsets) => Ok(offsets),
            Err(e) => {
                if let Some(meta) = fs::metadata(&self.path).ok().filter(|m| m.is_file()) {
                    self.len = meta.len();
                }
                Err(DriftError::StorageUnavailable(format!(
                    "data log {}: {}",
                    self.path.display(),
                    e
                )))
            }
        }
    }

    fn append_inner<K, V>(&mut self, records: &[(K, V)], sync: bool) -> io::Result<Vec<u64>>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut offsets = Vec::with_capacity(records.len());
        let mut cursor = file.metadata()?.len();
        let mut writer = BufWriter::new(file);
        for (key, value) in records {
            let bytes = encode_record(key.as_ref(), value.as_ref());
            writer.write_all(&bytes)?;
            offsets.push(cursor);
            cursor += bytes.len() as u64;
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_data()?;
        }

        self.len = cursor;
        Ok(offsets)
    }

    /// Read the record whose header starts at `offset`.
    ///
    /// Returns `Ok(None)` when the file does not exist (cold start) and
    /// [`DriftError::Corruption`] when the header claims more bytes than the
    /// file holds.
    pub fn read_at(&self, offset: u64) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();

        if offset.saturating_add(HEADER_SIZE as u64) > file_len {
            return Err(DriftError::Corruption(format!(
                "record header at offset {} is past the end of {} ({} bytes)",
                offset,
                self.path.display(),
                file_len
            )));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let (key_len, val_len) = decode_record_header(&header);

        let total = record_len(key_len, val_len)?;
        if offset.saturating_add(total) > file_len {
            return Err(DriftError::Corruption(format!(
                "record at offset {} claims {} bytes but {} holds only {}",
                offset,
                total,
                self.path.display(),
                file_len
            )));
        }

        let mut body = vec![0u8; (total - HEADER_SIZE as u64) as usize];
        file.read_exact(&mut body)?;

        decode_record_body(&body, key_len).map(Some)
    }

    /// Rename the file to `path` and return the handle for its new location
    pub fn persist_as(self, path: &Path) -> Result<Self> {
        fs::rename(&self.path, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            len: self.len,
        })
    }

    /// fsync the data log
    pub fn sync(&self) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        file.sync_all()?;
        Ok(())
    }

    /// Current length (append cursor)
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
