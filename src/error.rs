//! DataBot error types

use std::path::PathBuf;
use thiserror::Error;

/// DataBot error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot file does not exist
    #[error("Snapshot not found: {}", .0.display())]
    SnapshotNotFound(PathBuf),

    /// Snapshot file exists but cannot be parsed
    #[error("Invalid snapshot {}: {reason}", path.display())]
    SnapshotFormat { path: PathBuf, reason: String },

    /// Sales data error
    #[error("Sales data error: {0}")]
    Sales(String),

    /// Text generation error (transport, quota, empty completion)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error describes a missing or unreadable snapshot rather
    /// than a fault in the running process.
    pub fn is_snapshot_error(&self) -> bool {
        matches!(self, Error::SnapshotNotFound(_) | Error::SnapshotFormat { .. })
    }
}

/// Result type alias for DataBot operations
pub type Result<T> = std::result::Result<T, Error>;
