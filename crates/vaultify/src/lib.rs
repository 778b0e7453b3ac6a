//! # Vaultify
//!
//! Encrypted credential vault with an auditable, tamper-evident history and
//! offline-verifiable share certificates.
//!
//! ## Overview
//!
//! - **Envelope encryption**: each credential is sealed under a one-time
//!   AES-256-GCM key, and that key is wrapped with the owner's RSA key (OAEP)
//! - **Ledger**: an append-only SHA-256 hash chain recording every credential
//!   add/delete and token issue/revoke
//! - **Certificates**: RSA-signed proofs that a share token was issued,
//!   anchored to the ledger entry made at issue time
//!
//! ## Key Concepts
//!
//! - **Certificate validity** is cryptographic and offline: signature, ledger
//!   anchor, expiry.
//! - **Token status** is live policy: a revoked token's certificate still
//!   verifies. Use [`Vault::verify_share`] to check both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultify::{Vault, VaultConfig};
//! use vaultify::core::{Keypair, UserId};
//! use vaultify::store::MemoryKeyProvider;
//!
//! async fn example() -> vaultify::Result<()> {
//!     let keys = Arc::new(MemoryKeyProvider::new());
//!     keys.insert(UserId::new(7), Keypair::generate()?)?;
//!
//!     let vault = Vault::open(VaultConfig::with_data_dir("vault_data"), keys)?;
//!     let record = vault
//!         .add_credential(UserId::new(7), "db-password.txt", b"hunter2")
//!         .await?;
//!
//!     let share = vault
//!         .share_credential(UserId::new(7), &record.credential_id, Some(48))
//!         .await?;
//!     println!("certificate written to {}", share.certificate_path.display());
//!
//!     vault.shutdown().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `vaultify::core` - identifiers, hashing, RSA keys, ledger entries, tokens
//! - `vaultify::envelope` - content encryption and key wrapping
//! - `vaultify::ledger` - the hash-chained ledger and its append workers
//! - `vaultify::store` - repositories and key providers

pub mod certificate;
pub mod config;
pub mod error;
pub mod vault;

// Re-export component crates
pub use vaultify_core as core;
pub use vaultify_envelope as envelope;
pub use vaultify_ledger as ledger;
pub use vaultify_store as store;

pub use certificate::{
    certificate_file_name, issue_certificate, issue_certificate_at, payload_hash, payload_string,
    verify_certificate, verify_certificate_at, InvalidReason, ShareCertificate, Verdict, HOUR_MS,
    MIN_EXPIRY_HOURS,
};
pub use config::{StorageMode, VaultConfig};
pub use error::{Result, StorageFailure, VaultError};
pub use vault::{Share, ShareStatus, Vault};

pub use vaultify_core::{
    CredentialId, CredentialRecord, IntegrityViolation, Keypair, LedgerAction, LedgerEntry,
    PolicyDenial, PublicKey, ShareToken, TokenStatus, UserId,
};
