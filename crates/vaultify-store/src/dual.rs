//! Dual-write store: mirrors every write into a secondary backend.
//!
//! The primary is authoritative. A failed primary write fails the operation;
//! a failed secondary write is logged and tolerated. Reads come from the
//! primary and fall back to the secondary on a miss, except for credentials
//! deleted through this store: a stale secondary copy of those is never
//! served. Tombstones live in memory only.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use vaultify_core::{CredentialId, CredentialRecord, ShareToken, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, CredentialRepository, TokenRepository, VaultStore};

/// Two backends kept in step.
#[derive(Clone)]
pub struct DualStore {
    primary: Arc<dyn VaultStore>,
    secondary: Arc<dyn VaultStore>,
    deleted: Arc<Mutex<HashSet<CredentialId>>>,
}

impl DualStore {
    pub fn new(primary: Arc<dyn VaultStore>, secondary: Arc<dyn VaultStore>) -> Self {
        Self {
            primary,
            secondary,
            deleted: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn deleted(&self) -> Result<MutexGuard<'_, HashSet<CredentialId>>> {
        self.deleted.lock().map_err(|_| StoreError::Poisoned)
    }

    fn is_deleted(&self, id: &CredentialId) -> Result<bool> {
        Ok(self.deleted()?.contains(id))
    }

    pub fn primary(&self) -> &Arc<dyn VaultStore> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn VaultStore> {
        &self.secondary
    }
}

fn mirror<T>(op: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(op, error = %e, "secondary store write failed");
            None
        }
    }
}

#[async_trait]
impl CredentialRepository for DualStore {
    async fn save_credential(&self, record: &CredentialRecord) -> Result<()> {
        self.primary.save_credential(record).await?;
        self.deleted()?.remove(&record.credential_id);
        mirror("save_credential", self.secondary.save_credential(record).await);
        Ok(())
    }

    async fn find_credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>> {
        match self.primary.find_credential(id).await? {
            Some(record) => Ok(Some(record)),
            None if self.is_deleted(id)? => Ok(None),
            None => self.secondary.find_credential(id).await,
        }
    }

    async fn find_credentials_by_user(&self, user: UserId) -> Result<Vec<CredentialRecord>> {
        let mut records = self.primary.find_credentials_by_user(user).await?;
        let mut seen: HashSet<CredentialId> =
            records.iter().map(|r| r.credential_id.clone()).collect();
        seen.extend(self.deleted()?.iter().cloned());

        match self.secondary.find_credentials_by_user(user).await {
            Ok(extra) => records.extend(
                extra
                    .into_iter()
                    .filter(|r| !seen.contains(&r.credential_id)),
            ),
            Err(e) => tracing::warn!(error = %e, "secondary store read failed"),
        }

        records.sort_by(|a, b| {
            (a.timestamp, &a.credential_id).cmp(&(b.timestamp, &b.credential_id))
        });
        Ok(records)
    }

    async fn delete_credential(&self, id: &CredentialId) -> Result<bool> {
        let primary = self.primary.delete_credential(id).await?;
        self.deleted()?.insert(id.clone());
        let secondary = mirror("delete_credential", self.secondary.delete_credential(id).await);
        Ok(primary || secondary.unwrap_or(false))
    }
}

#[async_trait]
impl TokenRepository for DualStore {
    async fn save_token(&self, token: &ShareToken) -> Result<()> {
        self.primary.save_token(token).await?;
        mirror("save_token", self.secondary.save_token(token).await);
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<ShareToken>> {
        match self.primary.find_token(token).await? {
            Some(found) => Ok(Some(found)),
            None => self.secondary.find_token(token).await,
        }
    }

    async fn revoke_token(&self, token: &str) -> Result<bool> {
        let primary = self.primary.revoke_token(token).await?;
        let secondary = mirror("revoke_token", self.secondary.revoke_token(token).await);
        if primary {
            return Ok(true);
        }
        // Only a token the primary has never seen is decided by the secondary.
        if self.primary.find_token(token).await?.is_some() {
            return Ok(false);
        }
        Ok(secondary.unwrap_or(false))
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<usize> {
        let removed = self.primary.delete_expired_tokens(now).await?;
        mirror(
            "delete_expired_tokens",
            self.secondary.delete_expired_tokens(now).await,
        );
        Ok(removed)
    }
}

#[async_trait]
impl BlobStore for DualStore {
    async fn put_blob(&self, id: &CredentialId, bytes: &[u8]) -> Result<()> {
        self.primary.put_blob(id, bytes).await?;
        mirror("put_blob", self.secondary.put_blob(id, bytes).await);
        Ok(())
    }

    async fn get_blob(&self, id: &CredentialId) -> Result<Option<Vec<u8>>> {
        match self.primary.get_blob(id).await? {
            Some(bytes) => Ok(Some(bytes)),
            None if self.is_deleted(id)? => Ok(None),
            None => self.secondary.get_blob(id).await,
        }
    }

    async fn delete_blob(&self, id: &CredentialId) -> Result<bool> {
        let primary = self.primary.delete_blob(id).await?;
        let secondary = mirror("delete_blob", self.secondary.delete_blob(id).await);
        Ok(primary || secondary.unwrap_or(false))
    }
}
