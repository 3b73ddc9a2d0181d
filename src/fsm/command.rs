//! Replicated commands

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A write committed through the consensus log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsmCommand {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl FsmCommand {
    /// Serialize for the consensus log
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(super::bounded_codec(bytes.len()).deserialize(bytes)?)
    }
}
