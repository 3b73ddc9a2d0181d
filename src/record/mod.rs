//! Record Module
//!
//! Binary layout shared by the data log and the index log.
//!
//! ## Data Log Record
//! ```text
//! ┌──────────────┬──────────────┬───────────┬─────────────┐
//! │ KeyLen (8)   │ ValLen (8)   │ Key       │ Value       │
//! │ u64 BE       │ u64 BE       │ KeyLen B  │ ValLen B    │
//! └──────────────┴──────────────┴───────────┴─────────────┘
//! ```
//!
//! ## Index Log Entry
//! ```text
//! ┌──────────────┬──────────────┬───────────┐
//! │ KeyLen (8)   │ Offset (8)   │ Key       │
//! │ u64 BE       │ u64 BE       │ KeyLen B  │
//! └──────────────┴──────────────┴───────────┘
//! ```
//!
//! No checksums and no compression: the layout stays byte-compatible with
//! existing data/index files.

mod codec;

pub use codec::{
    decode_index_header, decode_record_body, decode_record_header, encode_index_entry,
    encode_record, index_entry_len, record_len,
};

/// Size of both the record header and the index entry header
pub const HEADER_SIZE: usize = 16;

/// Value written in place of a deleted key's value.
///
/// The format has no delete flag, so this literal is reserved: the engine
/// refuses to store it as a user value.
pub const TOMBSTONE: &[u8] = b"__KVGO_TOMBSTONE__";

/// True when `value` is the tombstone sentinel
pub fn is_tombstone(value: &[u8]) -> bool {
    value == TOMBSTONE
}
