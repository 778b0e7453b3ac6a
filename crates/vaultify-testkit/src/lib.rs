//! # Vaultify Testkit
//!
//! Testing utilities for Vaultify.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: ledger entry and certificate payload hashes with
//!   known outputs, for cross-implementation verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: cached RSA keys and ready-to-use vaults
//!
//! ## Golden Vectors
//!
//! ```rust
//! use vaultify_testkit::vectors::{ledger_vectors, verify_ledger_vectors};
//!
//! assert_eq!(ledger_vectors().len(), 3);
//! assert!(verify_ledger_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vaultify_testkit::generators::ledger_event;
//!
//! proptest! {
//!     #[test]
//!     fn data_hash_is_hex(event in ledger_event()) {
//!         prop_assert_eq!(event.data_hash().len(), 64);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! RSA key generation is slow, so fixture keys are generated once per process:
//!
//! ```rust,no_run
//! use vaultify_testkit::fixtures::TestVault;
//!
//! # async fn example() {
//! let fixture = TestVault::file_backed();
//! let record = fixture
//!     .vault
//!     .add_credential(fixture.owner, "note.txt", b"secret")
//!     .await
//!     .unwrap();
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, issuer_keypair, outsider_keypair, TestVault};
pub use generators::{ledger_event, plaintext};
pub use vectors::{ledger_vectors, verify_ledger_vectors, LedgerVector};
