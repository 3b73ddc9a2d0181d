//! MemTable implementation
//!
//! HashMap-based memtable; callers provide the locking.

use std::collections::HashMap;

use super::MemTableEntry;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: HashMap<Vec<u8>, MemTableEntry>,
    /// Approximate size of keys and values in bytes
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key, tombstones included
    pub fn get(&self, key: &[u8]) -> Option<&MemTableEntry> {
        self.data.get(key)
    }

    /// Put a key-value pair, returning the new entry count
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Record a tombstone for `key`, returning the new entry count
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&mut self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let key_len = key.len();
        let new_size = entry_size(&entry);
        match self.data.insert(key, entry) {
            Some(old) => self.size = self.size - entry_size(&old) + new_size,
            None => self.size += key_len + new_size,
        }
        self.data.len()
    }

    /// Number of entries (tombstones included)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Iterate over all entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &MemTableEntry)> {
        self.data.iter()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}

fn entry_size(entry: &MemTableEntry) -> usize {
    match entry {
        MemTableEntry::Value(value) => value.len(),
        MemTableEntry::Tombstone => 0,
    }
}
