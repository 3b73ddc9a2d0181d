//! Engine facade
//!
//! The narrow contract the protocol server and the state machine adapter
//! program against.

use std::sync::Arc;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Command, Response};

/// Uniform key-value interface over a storage engine
pub trait KvStore: Send + Sync {
    /// `Ok(None)` when the key was never written or is deleted
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Push buffered writes to disk
    fn flush(&self) -> Result<()>;

    /// `Ok(false)` when a compaction was already running
    fn compact(&self) -> Result<bool>;

    /// Flush and stop accepting writes
    fn close(&self) -> Result<()>;

    /// Every live key with its value
    fn live_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Execute a protocol command
    fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Get { key } => Ok(match self.get(&key)? {
                Some(value) => Response::Bulk(value),
                None => Response::Nil,
            }),
            Command::Set { key, value } => {
                self.set(&key, &value)?;
                Ok(Response::Ok)
            }
            Command::Del { key } => {
                self.delete(&key)?;
                Ok(Response::Integer(1))
            }
            Command::Ping => Ok(Response::Pong),
        }
    }
}

impl KvStore for Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Engine::get(self, key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Engine::set(self, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        Engine::delete(self, key)
    }

    fn flush(&self) -> Result<()> {
        Engine::flush(self)
    }

    fn compact(&self) -> Result<bool> {
        Engine::compact(self)
    }

    fn close(&self) -> Result<()> {
        Engine::close(self)
    }

    fn live_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Engine::live_entries(self)
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn compact(&self) -> Result<bool> {
        (**self).compact()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn live_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).live_entries()
    }
}
