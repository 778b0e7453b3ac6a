//! Error types for the ledger.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Snapshot I/O failed. The in-memory chain was left unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The persisted snapshot exists but cannot be parsed.
    #[error("corrupt ledger snapshot at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The append worker pool has shut down.
    #[error("ledger writer is no longer running")]
    WorkerGone,

    /// A thread panicked while holding the ledger lock.
    #[error("ledger lock poisoned")]
    Poisoned,
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
