//! Storage Module
//!
//! The append-only data log holding every flushed record.
//!
//! ## Responsibilities
//! - Track the append cursor (end of file)
//! - Append batches of records and report where each one starts
//! - Read exactly one record at a known offset, validating its lengths
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Record @ offset 0                      │
//! │ ┌────────┬────────┬─────┬───────────┐  │
//! │ │KeyLen 8│ValLen 8│ Key │   Value   │  │
//! │ └────────┴────────┴─────┴───────────┘  │
//! ├────────────────────────────────────────┤
//! │ Record @ offset 16 + k0 + v0           │
//! │ ... (repeated, no header or footer)    │
//! └────────────────────────────────────────┘
//! ```
//! Superseded records stay in place until compaction rewrites the file.

mod data_file;

pub use data_file::DataFile;
