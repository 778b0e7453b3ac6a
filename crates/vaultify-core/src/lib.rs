//! # Vaultify Core
//!
//! Pure primitives for Vaultify: ledger entries, identity keys, share tokens
//! and credential records.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data model shared by the envelope, ledger, store and vault crates.
//!
//! ## Key Types
//!
//! - [`LedgerEntry`] - One immutable record in the hash-chained audit log
//! - [`LedgerAction`] / [`LedgerEvent`] - Closed set of auditable vault actions
//! - [`Keypair`] / [`PublicKey`] - RSA identity keys (signing and key wrapping)
//! - [`ShareToken`] - One-time share secret with a revocation/expiry lifecycle
//! - [`CredentialRecord`] - Metadata for one encrypted credential blob
//!
//! ## Hash Encoding
//!
//! Entry hashes are SHA-256 over `index|timestamp|action|dataHash|prevHash`,
//! lowercase hex. See [`entry_hash`]. Every implementation must reproduce this
//! encoding exactly or chain verification diverges.

pub mod crypto;
pub mod entry;
pub mod error;
pub mod integrity;
pub mod record;
pub mod token;
pub mod types;

pub use crypto::{sha256_hex, Keypair, PublicKey, Sha256Hash, Signature, MIN_MODULUS_BITS};
pub use entry::{entry_hash, LedgerAction, LedgerEntry, LedgerEvent, GENESIS_PREV_HASH};
pub use error::{CoreError, Result};
pub use integrity::{verify_chain, IntegrityViolation, ViolationKind};
pub use record::{ContentCipher, CredentialRecord};
pub use token::{validate_token_format, PolicyDenial, ShareToken, TokenStatus, TOKEN_HEX_LEN};
pub use types::{now_millis, CredentialId, UserId};
