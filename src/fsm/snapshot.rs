//! Snapshots of the live key space

use std::io::{Read, Write};

use bincode::Options;

use crate::error::{DriftError, Result};

/// Live key → value pairs at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Snapshot {
    pub fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write payload + CRC32 trailer
    pub fn persist<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = bincode::serialize(&self.entries)?;
        let crc = crc32fast::hash(&payload);

        writer.write_all(&payload)?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Read a snapshot written by [`Snapshot::persist`], verifying the CRC
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < 4 {
            return Err(DriftError::Corruption(format!(
                "snapshot too short: {} bytes",
                bytes.len()
            )));
        }

        let (payload, trailer) = bytes.split_at(bytes.len() - 4);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(trailer);
        let expected = u32::from_le_bytes(crc_bytes);
        let actual = crc32fast::hash(payload);

        if expected != actual {
            return Err(DriftError::Corruption(format!(
                "snapshot checksum mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        let entries = super::bounded_codec(payload.len()).deserialize(payload)?;
        Ok(Self { entries })
    }
}
