//! Error types for the Vault.

use thiserror::Error;

use vaultify_core::{CoreError, IntegrityViolation, PolicyDenial};
use vaultify_envelope::EnvelopeError;
use vaultify_ledger::LedgerError;
use vaultify_store::StoreError;

/// Failure to persist or read back vault state.
#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during Vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Malformed input, such as an unparseable certificate or token.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad signature, AEAD tag mismatch, or unusable key material.
    ///
    /// Never retried.
    #[error("cryptographic failure: {0}")]
    Cryptographic(String),

    /// The ledger chain failed verification.
    #[error("ledger integrity violated ({} violations)", .0.len())]
    Integrity(Vec<IntegrityViolation>),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageFailure),

    /// Token revoked, expired or unknown.
    #[error("policy denied: {0}")]
    PolicyDenied(PolicyDenial),

    /// Credential, blob or key not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Not authorized.
    #[error("not authorized: {0}")]
    NotAuthorized(String),
}

impl From<LedgerError> for VaultError {
    fn from(e: LedgerError) -> Self {
        VaultError::Storage(StorageFailure::Ledger(e))
    }
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => VaultError::NotFound(what),
            StoreError::InvalidId(msg) => VaultError::Validation(msg),
            StoreError::InvalidData(msg) => VaultError::Cryptographic(msg),
            other => VaultError::Storage(StorageFailure::Store(other)),
        }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        VaultError::Storage(StorageFailure::Io(e))
    }
}

impl From<EnvelopeError> for VaultError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Core(core) => core.into(),
            other => VaultError::Cryptographic(other.to_string()),
        }
    }
}

impl From<CoreError> for VaultError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MalformedToken(_) | CoreError::MalformedHex(_) => {
                VaultError::Validation(e.to_string())
            }
            other => VaultError::Cryptographic(other.to_string()),
        }
    }
}

impl From<PolicyDenial> for VaultError {
    fn from(denial: PolicyDenial) -> Self {
        VaultError::PolicyDenied(denial)
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Validation(e.to_string())
    }
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
