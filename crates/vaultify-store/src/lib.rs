//! # Vaultify Store
//!
//! Storage abstraction for Vaultify. Provides trait-based repositories for
//! credential metadata, share tokens, ciphertext blobs and key material, with
//! several interchangeable backends.
//!
//! ## Key Types
//!
//! - [`CredentialRepository`] / [`TokenRepository`] / [`BlobStore`] - async repository traits
//! - [`VaultStore`] - all three, implemented by every backend
//! - [`KeyProvider`] - source of users' RSA keys
//! - [`MemoryStore`] - in-memory storage for tests
//! - [`FileStore`] - one JSON file per record
//! - [`SqliteStore`] - SQLite with versioned migrations
//! - [`DualStore`] - writes to two backends, reads with fallback
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultify_store::{DualStore, FileStore, SqliteStore, VaultStore};
//!
//! fn example() -> vaultify_store::Result<Arc<dyn VaultStore>> {
//!     let primary = Arc::new(SqliteStore::open("vault.db")?);
//!     let mirror = Arc::new(FileStore::open("vault-files")?);
//!     Ok(Arc::new(DualStore::new(primary, mirror)))
//! }
//! ```

pub mod dual;
pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod testing;

pub use dual::DualStore;
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use keys::{MemoryKeyProvider, PemKeyProvider};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, CredentialRepository, KeyProvider, TokenRepository, VaultStore};
