//! In-memory implementation of the repository traits.
//!
//! This is primarily for testing. It has the same semantics as the persistent
//! backends but keeps everything in memory.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use vaultify_core::{CredentialId, CredentialRecord, ShareToken, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, CredentialRepository, TokenRepository};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    credentials: HashMap<CredentialId, CredentialRecord>,
    tokens: HashMap<String, ShareToken>,
    blobs: HashMap<CredentialId, Vec<u8>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl CredentialRepository for MemoryStore {
    async fn save_credential(&self, record: &CredentialRecord) -> Result<()> {
        self.write()?
            .credentials
            .insert(record.credential_id.clone(), record.clone());
        Ok(())
    }

    async fn find_credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>> {
        Ok(self.read()?.credentials.get(id).cloned())
    }

    async fn find_credentials_by_user(&self, user: UserId) -> Result<Vec<CredentialRecord>> {
        let mut records: Vec<_> = self
            .read()?
            .credentials
            .values()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.timestamp, &a.credential_id).cmp(&(b.timestamp, &b.credential_id))
        });
        Ok(records)
    }

    async fn delete_credential(&self, id: &CredentialId) -> Result<bool> {
        Ok(self.write()?.credentials.remove(id).is_some())
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn save_token(&self, token: &ShareToken) -> Result<()> {
        self.write()?.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<ShareToken>> {
        Ok(self.read()?.tokens.get(token).cloned())
    }

    async fn revoke_token(&self, token: &str) -> Result<bool> {
        match self.write()?.tokens.get_mut(token) {
            Some(stored) if !stored.revoked => {
                stored.revoke();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.expiry_ms > now);
        Ok(before - inner.tokens.len())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put_blob(&self, id: &CredentialId, bytes: &[u8]) -> Result<()> {
        self.write()?.blobs.insert(id.clone(), bytes.to_vec());
        Ok(())
    }

    async fn get_blob(&self, id: &CredentialId) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.blobs.get(id).cloned())
    }

    async fn delete_blob(&self, id: &CredentialId) -> Result<bool> {
        Ok(self.write()?.blobs.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, token};

    #[tokio::test]
    async fn test_credential_crud() {
        let store = MemoryStore::new();
        let r = record("c1", 1, 100);

        store.save_credential(&r).await.unwrap();
        assert_eq!(store.find_credential(&r.credential_id).await.unwrap(), Some(r.clone()));

        assert!(store.delete_credential(&r.credential_id).await.unwrap());
        assert!(!store.delete_credential(&r.credential_id).await.unwrap());
        assert!(store.find_credential(&r.credential_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_user_sorted() {
        let store = MemoryStore::new();
        store.save_credential(&record("b", 1, 200)).await.unwrap();
        store.save_credential(&record("a", 1, 100)).await.unwrap();
        store.save_credential(&record("x", 2, 50)).await.unwrap();

        let ids: Vec<_> = store
            .find_credentials_by_user(UserId::new(1))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.credential_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_tokens() {
        let store = MemoryStore::new();
        let live = token(10_000);
        let stale = token(500);
        store.save_token(&live).await.unwrap();
        store.save_token(&stale).await.unwrap();

        assert!(store.revoke_token(&live.token).await.unwrap());
        assert!(!store.revoke_token(&live.token).await.unwrap());
        assert!(!store.revoke_token("missing").await.unwrap());
        assert!(store.find_token(&live.token).await.unwrap().unwrap().revoked);

        assert_eq!(store.delete_expired_tokens(1000).await.unwrap(), 1);
        assert!(store.find_token(&stale.token).await.unwrap().is_none());
        assert!(store.find_token(&live.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blobs() {
        let store = MemoryStore::new();
        let id = CredentialId::new("c1");
        store.put_blob(&id, b"cipher").await.unwrap();
        assert_eq!(store.get_blob(&id).await.unwrap().unwrap(), b"cipher");
        assert!(store.delete_blob(&id).await.unwrap());
        assert!(store.get_blob(&id).await.unwrap().is_none());
    }
}
