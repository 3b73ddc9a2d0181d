//! Index Module
//!
//! Maps every flushed key to the offset of its latest record in the data log.
//!
//! ## Responsibilities
//! - Rebuild the in-memory index by replaying the index log (last entry wins)
//! - Append one segment of entries per memtable flush
//! - Write a fresh index log for compaction
//!
//! The index log is never rewritten in place; compaction writes a new file
//! and renames it over the old one.

mod store;

use std::collections::HashMap;

pub use store::{IndexStore, ReplayStats};

/// In-memory index: key → offset of the record header in the data log
pub type Index = HashMap<Vec<u8>, u64>;
