//! State Machine Module
//!
//! Adapter a consensus layer drives to replicate the engine.
//!
//! ## Responsibilities
//! - Decode committed log payloads into `Set` / `Delete` and apply them
//! - Produce a checksummed snapshot of the live key space
//! - Restore the key space from such a snapshot
//!
//! Leadership checks, log replication and membership belong to the
//! consensus layer; nothing here knows about them.
//!
//! ## Snapshot Format
//! ```text
//! ┌──────────────────────────────┬───────────────┐
//! │ bincode(Vec<(key, value)>)   │ CRC32 LE (4)  │
//! └──────────────────────────────┴───────────────┘
//! ```

mod command;
mod machine;
mod snapshot;

pub use command::FsmCommand;
pub use machine::StateMachine;
pub use snapshot::Snapshot;

use bincode::Options;

/// bincode settings matching `bincode::serialize`, with reads capped at
/// `limit` bytes so a length prefix cannot claim more than the input holds
fn bounded_codec(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit as u64)
}
