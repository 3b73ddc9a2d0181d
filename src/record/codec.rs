//! Record codec
//!
//! Encoding and decoding of data records and index entries.

use crate::error::{DriftError, Result};

use super::HEADER_SIZE;

// =============================================================================
// Data Records
// =============================================================================

/// Encode a record: key_len (8) + val_len (8) + key + value
pub fn encode_record(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + key.len() + value.len());
    buf.extend_from_slice(&(key.len() as u64).to_be_bytes());
    buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf
}

/// Decode a record header into (key_len, val_len)
pub fn decode_record_header(header: &[u8; HEADER_SIZE]) -> (u64, u64) {
    split_header(header)
}

/// Split a record body (exactly key_len + val_len bytes) into key and value
pub fn decode_record_body(body: &[u8], key_len: u64) -> Result<(Vec<u8>, Vec<u8>)> {
    let key_len = usize::try_from(key_len)
        .ok()
        .filter(|&len| len <= body.len())
        .ok_or_else(|| {
            DriftError::Corruption(format!(
                "record key length {} exceeds body of {} bytes",
                key_len,
                body.len()
            ))
        })?;

    let (key, value) = body.split_at(key_len);
    Ok((key.to_vec(), value.to_vec()))
}

/// Total on-disk size of a record with the given lengths
pub fn record_len(key_len: u64, val_len: u64) -> Result<u64> {
    key_len
        .checked_add(val_len)
        .and_then(|body| body.checked_add(HEADER_SIZE as u64))
        .ok_or_else(|| {
            DriftError::Corruption(format!(
                "record lengths overflow: key_len={} val_len={}",
                key_len, val_len
            ))
        })
}

// =============================================================================
// Index Entries
// =============================================================================

/// Encode an index entry: key_len (8) + offset (8) + key
pub fn encode_index_entry(key: &[u8], offset: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + key.len());
    buf.extend_from_slice(&(key.len() as u64).to_be_bytes());
    buf.extend_from_slice(&offset.to_be_bytes());
    buf.extend_from_slice(key);
    buf
}

/// Decode an index entry header into (key_len, offset)
pub fn decode_index_header(header: &[u8; HEADER_SIZE]) -> (u64, u64) {
    split_header(header)
}

/// Total on-disk size of an index entry for a key of `key_len` bytes
pub fn index_entry_len(key_len: u64) -> Result<u64> {
    key_len.checked_add(HEADER_SIZE as u64).ok_or_else(|| {
        DriftError::Corruption(format!("index key length overflows: {}", key_len))
    })
}

fn split_header(header: &[u8; HEADER_SIZE]) -> (u64, u64) {
    let mut first = [0u8; 8];
    let mut second = [0u8; 8];
    first.copy_from_slice(&header[0..8]);
    second.copy_from_slice(&header[8..16]);
    (u64::from_be_bytes(first), u64::from_be_bytes(second))
}
