//! State machine over a [`KvStore`]

use std::collections::HashSet;
use std::io::Read;

use crate::error::Result;
use crate::store::KvStore;

use super::{FsmCommand, Snapshot};

/// Applies committed commands to a store and moves its state in and out
/// of snapshots
pub struct StateMachine<S: KvStore> {
    store: S,
}

impl<S: KvStore> StateMachine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply one committed log payload
    pub fn apply(&self, payload: &[u8]) -> Result<()> {
        match FsmCommand::decode(payload)? {
            FsmCommand::Set { key, value } => self.store.set(&key, &value),
            FsmCommand::Delete { key } => self.store.delete(&key),
        }
    }

    /// Capture the live key space
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.store.live_entries()?))
    }

    /// Replace the key space with the snapshot read from `reader`.
    ///
    /// Keys missing from the snapshot are deleted; the result is flushed.
    pub fn restore<R: Read>(&self, reader: &mut R) -> Result<usize> {
        let snapshot = Snapshot::read_from(reader)?;

        let keep: HashSet<&[u8]> = snapshot.entries.iter().map(|(k, _)| k.as_slice()).collect();
        for (key, _) in self.store.live_entries()? {
            if !keep.contains(key.as_slice()) {
                self.store.delete(&key)?;
            }
        }

        for (key, value) in &snapshot.entries {
            self.store.set(key, value)?;
        }
        self.store.flush()?;

        tracing::info!("Restored {} keys from snapshot", snapshot.len());
        Ok(snapshot.len())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
