//! # DriftKV
//!
//! A persistent key-value store built on two append-only logs:
//! - A MemTable that absorbs writes and is flushed by entry count
//! - A data log of length-prefixed records and an index log of key → offset
//! - Background compaction that rewrites both logs down to live keys
//! - A RESP-like TCP protocol and a state machine adapter for replication
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────┐   ┌─────────────────────────┐
//! │       TCP Server        │   │      StateMachine       │
//! │   (RESP-like protocol)  │   │ (apply/snapshot/restore)│
//! └────────────┬────────────┘   └────────────┬────────────┘
//!              │                             │
//! ┌────────────▼─────────────────────────────▼────────────┐
//! │                    KvStore facade                     │
//! └──────────────────────────┬────────────────────────────┘
//!                            │
//! ┌──────────────────────────▼────────────────────────────┐
//! │                        Engine                         │
//! │        (RwLock over MemTable + Index + cursor)        │
//! └──────┬───────────────────┬───────────────────┬────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//!  ┌───────────┐      ┌─────────────┐     ┌─────────────┐
//!  │ MemTable  │      │  Data log   │     │  Index log  │
//!  │ (HashMap) │      │  (records)  │     │ (key→offset)│
//!  └───────────┘      └─────────────┘     └─────────────┘
//!                            ▲                   ▲
//!                            └─────── Compaction ┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod memtable;
pub mod storage;
pub mod engine;
pub mod store;
pub mod fsm;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DriftError, Result};
pub use config::Config;
pub use engine::{CompactionScheduler, Engine, EngineStats};
pub use store::KvStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DriftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
