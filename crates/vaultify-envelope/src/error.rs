//! Error types for envelope encryption.

use thiserror::Error;

/// Errors that can occur while sealing or opening content.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Authentication tag mismatch, OAEP padding failure, or unusable key.
    ///
    /// Retrying with identical inputs cannot succeed.
    #[error("cryptographic failure: {0}")]
    Cryptographic(String),

    /// A key, IV or unwrapped key had the wrong size.
    #[error("invalid {what} length: expected {expected}, found {found}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] vaultify_core::CoreError),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
