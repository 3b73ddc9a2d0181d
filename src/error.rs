//! Error types for DriftKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for DriftKV operations
#[derive(Debug, Error)]
pub enum DriftError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// The write path could not reach the data or index log.
    /// Callers may retry; nothing was acknowledged.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Value is reserved for tombstones and cannot be stored")]
    ReservedValue,

    #[error("Engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for DriftError {
    fn from(err: bincode::Error) -> Self {
        DriftError::Serialization(err.to_string())
    }
}
