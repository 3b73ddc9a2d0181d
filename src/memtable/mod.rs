//! MemTable Module
//!
//! In-memory buffer for writes that have not been flushed yet.
//!
//! ## Responsibilities
//! - O(1) puts, deletes and lookups
//! - Shadow the on-disk index until the next flush
//! - Count entries for the flush trigger
//!
//! ## Data Structure Choice
//! A plain HashMap. The engine's RwLock already guards the memtable together
//! with the index and the append cursor, and flush order across keys carries
//! no meaning, so neither an inner lock nor sorted keys are needed.

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Bytes this entry occupies in the data log's value field
    pub fn as_value_bytes(&self) -> &[u8] {
        match self {
            MemTableEntry::Value(value) => value,
            MemTableEntry::Tombstone => crate::record::TOMBSTONE,
        }
    }
}
