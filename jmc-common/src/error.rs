//! Common error types for jmcollector

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for jmcollector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the jmcollector crates
#[derive(Error, Debug)]
pub enum Error {
    /// File content could not be read while hashing.
    ///
    /// Recorded per file; never aborts hashing of other files.
    #[error("Hash I/O error for {path}: {source}")]
    HashIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller-side corruption (history longer than the volume count,
    /// zero capacity, conflicting digest). Never silently clamped.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input value (priority out of range, malformed digest)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O failure encountered while reading `path` for hashing
    pub fn hash_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::HashIo {
            path: path.into(),
            source,
        }
    }

    /// True for errors that indicate corrupted caller state
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::PreconditionViolation(_))
    }
}
