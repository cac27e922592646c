//! Error types for gzindex
//!
//! Provides a unified error type for all operations.
//!
//! "Not an indexed stream" is only an error on [`IndexedReader::open`];
//! detection reports it as `false` and the boundary locator reports a missing
//! header as `None`.
//!
//! [`IndexedReader::open`]: crate::format::IndexedReader::open

use thiserror::Error;

/// Result type alias using GzIndexError
pub type Result<T> = std::result::Result<T, GzIndexError>;

/// Unified error type for gzindex operations
#[derive(Debug, Error)]
pub enum GzIndexError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Writer Errors
    // -------------------------------------------------------------------------
    /// `mark` was called with a key that does not strictly follow the last one
    #[error("Logical key {key} is not greater than previous key {previous}")]
    OrderingViolation { previous: u64, key: u64 },

    #[error("Writer already finished")]
    Finished,

    /// The offset map already holds the most entries a reader accepts
    #[error("Offset index is full ({limit} entries)")]
    IndexFull { limit: u64 },

    // -------------------------------------------------------------------------
    // Reader Errors
    // -------------------------------------------------------------------------
    /// A trailer member is present but its offset map cannot be parsed
    #[error("Corrupt offset index: {0}")]
    CorruptIndex(String),

    #[error("Stream does not carry an offset index")]
    NotIndexed,

    #[error("Logical key {key} is before the first indexed key {first:?}")]
    KeyBeforeRange { key: u64, first: Option<u64> },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Split worker panicked")]
    WorkerPanicked,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for GzIndexError {
    fn from(e: bincode::Error) -> Self {
        GzIndexError::Serialization(e.to_string())
    }
}
