//! Error types for Vaultify Core.

use thiserror::Error;

/// Core errors that can occur while handling keys, signatures and encodings.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("RSA modulus too small: {bits} bits (minimum {minimum})")]
    KeyTooSmall { bits: usize, minimum: usize },

    #[error("malformed hex: {0}")]
    MalformedHex(String),

    #[error("malformed share token: {0}")]
    MalformedToken(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
