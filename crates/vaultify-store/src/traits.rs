//! Repository traits: the abstract interface for vault persistence.
//!
//! The vault depends only on these traits. Backends are chosen once at
//! startup and handed over as trait objects.

use async_trait::async_trait;
use vaultify_core::{CredentialId, CredentialRecord, Keypair, PublicKey, ShareToken, UserId};

use crate::error::Result;

/// Credential metadata persistence.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert or replace a credential record.
    async fn save_credential(&self, record: &CredentialRecord) -> Result<()>;

    /// Get a credential record by id.
    async fn find_credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>>;

    /// All credentials owned by a user, oldest first.
    async fn find_credentials_by_user(&self, user: UserId) -> Result<Vec<CredentialRecord>>;

    /// Delete a credential record. Returns whether it existed.
    async fn delete_credential(&self, id: &CredentialId) -> Result<bool>;
}

/// Share token persistence.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert or replace a token.
    async fn save_token(&self, token: &ShareToken) -> Result<()>;

    /// Look up a token by its secret value.
    async fn find_token(&self, token: &str) -> Result<Option<ShareToken>>;

    /// Mark a token revoked.
    ///
    /// Returns `true` only for the call that flips the flag: `false` when the
    /// token is missing or was already revoked.
    async fn revoke_token(&self, token: &str) -> Result<bool>;

    /// Remove every token with `expiry_ms <= now`. Returns the number removed.
    async fn delete_expired_tokens(&self, now: i64) -> Result<usize>;
}

/// Ciphertext blob persistence, keyed by credential id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_blob(&self, id: &CredentialId, bytes: &[u8]) -> Result<()>;

    async fn get_blob(&self, id: &CredentialId) -> Result<Option<Vec<u8>>>;

    /// Returns whether the blob existed.
    async fn delete_blob(&self, id: &CredentialId) -> Result<bool>;
}

/// Everything the vault persists, in one backend.
pub trait VaultStore: CredentialRepository + TokenRepository + BlobStore {}

impl<T: CredentialRepository + TokenRepository + BlobStore> VaultStore for T {}

/// Source of users' RSA key material.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// A user's public key, used to wrap content keys and verify signatures.
    async fn public_key(&self, user: UserId) -> Result<PublicKey>;

    /// A user's full keypair, used to unwrap content keys and sign.
    async fn keypair(&self, user: UserId) -> Result<Keypair>;
}
