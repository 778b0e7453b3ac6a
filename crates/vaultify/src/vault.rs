//! The Vault: credential storage, sharing and audit in one service.
//!
//! Content is encrypted on the calling task; ledger appends for new
//! credentials are queued onto a [`LedgerWriter`] and may land in any order
//! relative to other writers. Deletions, revocations and certificate issuance
//! wait for their ledger entry, and a deletion or revocation whose entry
//! cannot be written is rolled back in the store.
//!
//! The ledger lock is only ever taken on the blocking pool.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use vaultify_core::{
    now_millis, validate_token_format, ContentCipher, CredentialId, CredentialRecord,
    IntegrityViolation, LedgerEntry, LedgerEvent, PolicyDenial, PublicKey, ShareToken, UserId,
};
use vaultify_envelope::SealedContent;
use vaultify_ledger::{Ledger, LedgerError, LedgerWriter, PendingAppend};
use vaultify_store::{
    BlobStore, CredentialRepository, DualStore, FileStore, KeyProvider, MemoryStore, SqliteStore,
    TokenRepository, VaultStore,
};

use crate::certificate::{
    expiry_from_hours, issue_certificate_at, verify_certificate_at, InvalidReason,
    ShareCertificate, Verdict,
};
use crate::config::{StorageMode, VaultConfig};
use crate::error::{Result, VaultError};

/// A freshly issued share.
#[derive(Debug, Clone)]
pub struct Share {
    pub token: ShareToken,
    pub certificate: ShareCertificate,
    /// Where the certificate artifact was written.
    pub certificate_path: PathBuf,
}

/// Combined certificate and live token check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareStatus {
    /// Certificate verifies and the token is active.
    Valid(ShareToken),
    /// The certificate itself is not valid.
    InvalidCertificate(InvalidReason),
    /// The certificate verifies but the token is refused.
    Denied(PolicyDenial),
}

impl ShareStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ShareStatus::Valid(_))
    }
}

/// The main Vault struct.
pub struct Vault {
    config: VaultConfig,
    ledger: Arc<Ledger>,
    writer: LedgerWriter,
    store: Arc<dyn VaultStore>,
    keys: Arc<dyn KeyProvider>,
    cipher: ContentCipher,
    /// Queued appends not yet observed as finished.
    pending: Mutex<Vec<PendingAppend>>,
}

impl Vault {
    /// Open the ledger and storage backend named by `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: VaultConfig, keys: Arc<dyn KeyProvider>) -> Result<Self> {
        if config.storage != StorageMode::Memory {
            std::fs::create_dir_all(&config.data_dir)?;
        }
        let (ledger, store): (Ledger, Arc<dyn VaultStore>) = match config.storage {
            StorageMode::Memory => (Ledger::in_memory()?, Arc::new(MemoryStore::new())),
            StorageMode::File => (
                Ledger::open(&config.ledger_path)?,
                Arc::new(FileStore::open(config.store_dir())?),
            ),
            StorageMode::Sqlite => (
                Ledger::open(&config.ledger_path)?,
                Arc::new(SqliteStore::open(config.database_path())?),
            ),
            StorageMode::Dual => {
                let primary = Arc::new(SqliteStore::open(config.database_path())?);
                let secondary = Arc::new(FileStore::open(config.store_dir())?);
                (
                    Ledger::open(&config.ledger_path)?,
                    Arc::new(DualStore::new(primary, secondary)),
                )
            }
        };

        tracing::info!(
            storage = ?config.storage,
            data_dir = %config.data_dir.display(),
            "vault opened"
        );
        Ok(Self::with_parts(config, Arc::new(ledger), store, keys))
    }

    /// Assemble a vault from already-open parts.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_parts(
        config: VaultConfig,
        ledger: Arc<Ledger>,
        store: Arc<dyn VaultStore>,
        keys: Arc<dyn KeyProvider>,
    ) -> Self {
        let writer = LedgerWriter::spawn(
            ledger.clone(),
            config.ledger_workers,
            config.ledger_queue_capacity,
        );
        Self {
            config,
            ledger,
            writer,
            store,
            keys,
            cipher: ContentCipher::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Use `cipher` for content added from now on.
    pub fn with_cipher(mut self, cipher: ContentCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn VaultStore> {
        &self.store
    }

    /// A user's public key, as used to verify their certificates.
    pub async fn public_key(&self, user: UserId) -> Result<PublicKey> {
        Ok(self.keys.public_key(user).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store a credential for `owner`.
    ///
    /// The `ADD_CREDENTIAL` ledger entry is queued; [`Vault::flush`] waits
    /// for it.
    pub async fn add_credential(
        &self,
        owner: UserId,
        filename: &str,
        plaintext: &[u8],
    ) -> Result<CredentialRecord> {
        let recipient = self.keys.public_key(owner).await?;
        let sealed = SealedContent::seal_with(self.cipher, plaintext, &recipient)?;

        let (record, ciphertext) =
            sealed.into_record(CredentialId::generate(), owner, filename, now_millis());
        self.store.put_blob(&record.credential_id, &ciphertext).await?;
        self.store.save_credential(&record).await?;

        let pending = self
            .writer
            .submit(LedgerEvent::AddCredential {
                credential_id: record.credential_id.clone(),
                user_id: owner,
                content_hash: record.content_hash.clone(),
            })
            .await?;
        self.track(pending).await;

        tracing::info!(
            user = %owner,
            credential_id = %record.credential_id,
            size = record.file_size,
            "credential added"
        );
        Ok(record)
    }

    /// Decrypt a credential owned by `owner`.
    ///
    /// Fails with a cryptographic error if the plaintext no longer matches
    /// the stored content hash.
    pub async fn open_credential(&self, owner: UserId, id: &CredentialId) -> Result<Vec<u8>> {
        let record = self.owned_credential(owner, id).await?;
        let ciphertext = self
            .store
            .get_blob(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("ciphertext for credential {id}")))?;

        let keypair = self.keys.keypair(owner).await?;
        let sealed = SealedContent::from_record(&record, ciphertext)?;
        Ok(sealed.open_verified(&keypair)?)
    }

    /// Credentials owned by `owner`, oldest first.
    pub async fn list_credentials(&self, owner: UserId) -> Result<Vec<CredentialRecord>> {
        Ok(self.store.find_credentials_by_user(owner).await?)
    }

    /// Remove a credential and its ciphertext, recording the deletion.
    ///
    /// The record is removed first and put back if the `DELETE_CREDENTIAL`
    /// entry cannot be written. Of two concurrent deletions only one
    /// succeeds; the other sees [`VaultError::NotFound`].
    pub async fn delete_credential(&self, owner: UserId, id: &CredentialId) -> Result<LedgerEntry> {
        let record = self.owned_credential(owner, id).await?;

        if !self.store.delete_credential(id).await? {
            return Err(VaultError::NotFound(format!("credential {id}")));
        }

        let appended = self
            .writer
            .append(LedgerEvent::DeleteCredential {
                credential_id: id.clone(),
                user_id: owner,
            })
            .await;
        let entry = match appended {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(restore) = self.store.save_credential(&record).await {
                    tracing::error!(
                        credential_id = %id,
                        error = %restore,
                        "could not restore credential after failed ledger append"
                    );
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.delete_blob(id).await {
            tracing::warn!(credential_id = %id, error = %e, "ciphertext left behind after deletion");
        }

        tracing::info!(user = %owner, credential_id = %id, ledger_index = entry.index, "credential deleted");
        Ok(entry)
    }

    async fn owned_credential(&self, owner: UserId, id: &CredentialId) -> Result<CredentialRecord> {
        let record = self
            .store
            .find_credential(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("credential {id}")))?;
        if record.user_id != owner {
            return Err(VaultError::NotAuthorized(format!(
                "credential {id} is not owned by user {owner}"
            )));
        }
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a share token for a credential, with a signed certificate
    /// written to the certificates directory.
    ///
    /// `expiry_hours` defaults to the configured share lifetime and is
    /// clamped to at least one hour.
    pub async fn share_credential(
        &self,
        owner: UserId,
        id: &CredentialId,
        expiry_hours: Option<i64>,
    ) -> Result<Share> {
        self.owned_credential(owner, id).await?;

        let hours = expiry_hours.unwrap_or(self.config.default_share_hours);
        let now = now_millis();
        let token = ShareToken::generate(owner, id.clone(), expiry_from_hours(now, hours), now);
        let keypair = self.keys.keypair(owner).await?;

        let ledger = self.ledger.clone();
        let secret = token.token.clone();
        let credential_id = id.clone();
        let certificate = tokio::task::spawn_blocking(move || {
            issue_certificate_at(&ledger, &secret, owner, &credential_id, hours, &keypair, now)
        })
        .await
        .map_err(|e| VaultError::Cryptographic(format!("certificate task failed: {e}")))??;

        self.store.save_token(&token).await?;

        let certificate_path = self.config.certificate_path(certificate.file_name());
        let artifact = certificate.clone();
        let path = certificate_path.clone();
        tokio::task::spawn_blocking(move || artifact.save(&path))
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))??;

        tracing::info!(
            user = %owner,
            credential_id = %id,
            token = token.redacted(),
            expiry_ms = token.expiry_ms,
            "credential shared"
        );
        Ok(Share {
            token,
            certificate,
            certificate_path,
        })
    }

    /// Revoke a token issued by `issuer`, recording the revocation.
    ///
    /// The store decides which of several concurrent revocations wins; the
    /// rest are denied as already revoked. The flag is cleared again if the
    /// `REVOKE_TOKEN` entry cannot be written.
    pub async fn revoke_token(&self, issuer: UserId, token: &str) -> Result<LedgerEntry> {
        validate_token_format(token)?;
        let found = self
            .store
            .find_token(token)
            .await?
            .ok_or(VaultError::PolicyDenied(PolicyDenial::Unknown))?;
        if found.issuer_id != issuer {
            return Err(VaultError::NotAuthorized(format!(
                "token was not issued by user {issuer}"
            )));
        }
        if found.revoked {
            return Err(VaultError::PolicyDenied(PolicyDenial::Revoked));
        }

        if !self.store.revoke_token(token).await? {
            let denial = match self.store.find_token(token).await? {
                Some(_) => PolicyDenial::Revoked,
                None => PolicyDenial::Unknown,
            };
            return Err(VaultError::PolicyDenied(denial));
        }

        let appended = self
            .writer
            .append(LedgerEvent::RevokeToken {
                token: token.to_string(),
            })
            .await;
        let entry = match appended {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(restore) = self.store.save_token(&found).await {
                    tracing::error!(
                        token = found.redacted(),
                        error = %restore,
                        "could not restore token after failed ledger append"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(user = %issuer, token = found.redacted(), ledger_index = entry.index, "token revoked");
        Ok(entry)
    }

    /// Look up a token and check it against revocation and expiry.
    pub async fn validate_token(&self, token: &str) -> Result<ShareToken> {
        self.validate_token_at(token, now_millis()).await
    }

    pub async fn validate_token_at(&self, token: &str, now: i64) -> Result<ShareToken> {
        validate_token_format(token)?;
        let found = self
            .store
            .find_token(token)
            .await?
            .ok_or(VaultError::PolicyDenied(PolicyDenial::Unknown))?;
        found.check(now)?;
        Ok(found)
    }

    /// Verify a certificate against the ledger and the live token state.
    pub async fn verify_share(
        &self,
        certificate: &ShareCertificate,
        issuer_key: &PublicKey,
    ) -> Result<ShareStatus> {
        self.verify_share_at(certificate, issuer_key, now_millis()).await
    }

    pub async fn verify_share_at(
        &self,
        certificate: &ShareCertificate,
        issuer_key: &PublicKey,
        now: i64,
    ) -> Result<ShareStatus> {
        let chain = self.ledger_chain().await?;
        if let Verdict::Invalid(reason) = verify_certificate_at(certificate, issuer_key, &chain, now)
        {
            return Ok(ShareStatus::InvalidCertificate(reason));
        }

        let Some(token) = self.store.find_token(&certificate.token).await? else {
            return Ok(ShareStatus::Denied(PolicyDenial::Unknown));
        };
        if token.issuer_id != certificate.issuer_id
            || token.credential_id != certificate.credential_id
        {
            tracing::warn!(token = token.redacted(), "certificate does not match stored token");
            return Ok(ShareStatus::Denied(PolicyDenial::Unknown));
        }

        Ok(match token.check(now) {
            Ok(()) => ShareStatus::Valid(token),
            Err(denial) => ShareStatus::Denied(denial),
        })
    }

    /// Remove tokens past their expiry. Returns how many were removed.
    pub async fn cleanup_expired_tokens(&self, now: i64) -> Result<usize> {
        let removed = self.store.delete_expired_tokens(now).await?;
        if removed > 0 {
            tracing::info!(removed, "expired tokens removed");
        }
        Ok(removed)
    }

    /// Run [`Vault::cleanup_expired_tokens`] every `period` until the task is
    /// aborted.
    pub fn spawn_token_cleanup(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let vault = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = vault.cleanup_expired_tokens(now_millis()).await {
                    tracing::warn!(error = %e, "token cleanup failed");
                }
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Every integrity violation in the ledger; empty when intact.
    pub async fn verify_ledger(&self) -> Result<Vec<IntegrityViolation>> {
        self.with_ledger(|ledger| ledger.verify_integrity()).await
    }

    /// Fail with [`VaultError::Integrity`] unless the ledger verifies.
    pub async fn ensure_ledger_intact(&self) -> Result<()> {
        let violations = self.verify_ledger().await?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(VaultError::Integrity(violations))
        }
    }

    /// A copy of the ledger chain.
    pub async fn ledger_chain(&self) -> Result<Vec<LedgerEntry>> {
        self.with_ledger(|ledger| ledger.chain()).await
    }

    async fn with_ledger<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Ledger) -> std::result::Result<T, LedgerError> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        let result = tokio::task::spawn_blocking(move || f(&ledger))
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))?;
        Ok(result?)
    }

    /// Wait for every queued ledger append.
    ///
    /// Returns the first failure among the appends still outstanding, after
    /// all of them have settled. Failures seen earlier were already logged.
    pub async fn flush(&self) -> Result<()> {
        let pending = std::mem::take(&mut *self.pending.lock().await);
        let mut first_error = None;
        for append in pending {
            if let Err(e) = append.wait().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Flush, then stop the ledger workers.
    ///
    /// Takes `&self` so a vault shared with [`Vault::spawn_token_cleanup`]
    /// can be shut down through its `Arc`. Ledger-writing operations fail
    /// afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let flushed = self.flush().await;
        self.writer.shutdown().await;
        flushed
    }

    async fn track(&self, append: PendingAppend) {
        let mut pending = self.pending.lock().await;
        pending.retain_mut(|p| match p.try_result() {
            None => true,
            Some(Ok(_)) => false,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "queued ledger append failed");
                false
            }
        });
        pending.push(append);
    }
}
