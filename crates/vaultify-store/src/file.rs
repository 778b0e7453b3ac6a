//! JSON-file implementation of the repository traits.
//!
//! Layout under the root directory:
//!
//! ```text
//! credentials/<credential_id>.json
//! tokens/<token>.json
//! blobs/<credential_id>.bin
//! ```
//!
//! Every write stages to a uniquely named temp file in the target's directory
//! and renames it over the target. Token revocation is serialized within the
//! process so that exactly one caller observes the flip.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use vaultify_core::{CredentialId, CredentialRecord, ShareToken, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, CredentialRepository, TokenRepository};

const CREDENTIALS_DIR: &str = "credentials";
const TOKENS_DIR: &str = "tokens";
const BLOBS_DIR: &str = "blobs";

/// File-per-record store.
///
/// All operations use spawn_blocking to avoid blocking the async runtime.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Arc<PathBuf>,
    revocations: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [CREDENTIALS_DIR, TOKENS_DIR, BLOBS_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root: Arc::new(root),
            revocations: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || f(&root))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e.to_string())))?
    }
}

/// Reject identifiers that are not safe as a single path component.
fn file_key(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(StoreError::InvalidId(format!(
            "identifier not usable as a file name: {id:?}"
        )))
    }
}

/// The temp file is removed on drop if any step fails.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_optional(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_optional(path)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Every `*.json` record in a directory. Unparseable files are skipped.
fn read_all_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record"),
        }
    }
    Ok(records)
}

#[async_trait]
impl CredentialRepository for FileStore {
    async fn save_credential(&self, record: &CredentialRecord) -> Result<()> {
        let record = record.clone();
        self.blocking(move |root| {
            let key = file_key(record.credential_id.as_str())?;
            let path = root.join(CREDENTIALS_DIR).join(format!("{key}.json"));
            write_atomic(&path, &serde_json::to_vec_pretty(&record)?)
        })
        .await
    }

    async fn find_credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>> {
        let id = id.clone();
        self.blocking(move |root| {
            let key = file_key(id.as_str())?;
            read_json(&root.join(CREDENTIALS_DIR).join(format!("{key}.json")))
        })
        .await
    }

    async fn find_credentials_by_user(&self, user: UserId) -> Result<Vec<CredentialRecord>> {
        self.blocking(move |root| {
            let mut records: Vec<CredentialRecord> = read_all_json(&root.join(CREDENTIALS_DIR))?
                .into_iter()
                .filter(|r: &CredentialRecord| r.user_id == user)
                .collect();
            records.sort_by(|a, b| {
                (a.timestamp, &a.credential_id).cmp(&(b.timestamp, &b.credential_id))
            });
            Ok(records)
        })
        .await
    }

    async fn delete_credential(&self, id: &CredentialId) -> Result<bool> {
        let id = id.clone();
        self.blocking(move |root| {
            let key = file_key(id.as_str())?;
            remove_optional(&root.join(CREDENTIALS_DIR).join(format!("{key}.json")))
        })
        .await
    }
}

#[async_trait]
impl TokenRepository for FileStore {
    async fn save_token(&self, token: &ShareToken) -> Result<()> {
        let token = token.clone();
        self.blocking(move |root| {
            let key = file_key(&token.token)?;
            let path = root.join(TOKENS_DIR).join(format!("{key}.json"));
            write_atomic(&path, &serde_json::to_vec_pretty(&token)?)
        })
        .await
    }

    async fn find_token(&self, token: &str) -> Result<Option<ShareToken>> {
        let token = token.to_string();
        self.blocking(move |root| {
            let key = file_key(&token)?;
            read_json(&root.join(TOKENS_DIR).join(format!("{key}.json")))
        })
        .await
    }

    async fn revoke_token(&self, token: &str) -> Result<bool> {
        let token = token.to_string();
        let revocations = self.revocations.clone();
        self.blocking(move |root| {
            let key = file_key(&token)?;
            let path = root.join(TOKENS_DIR).join(format!("{key}.json"));
            let _guard = revocations.lock().map_err(|_| StoreError::Poisoned)?;
            let Some(mut stored) = read_json::<ShareToken>(&path)? else {
                return Ok(false);
            };
            if stored.revoked {
                return Ok(false);
            }
            stored.revoke();
            write_atomic(&path, &serde_json::to_vec_pretty(&stored)?)?;
            Ok(true)
        })
        .await
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<usize> {
        self.blocking(move |root| {
            let dir = root.join(TOKENS_DIR);
            let mut removed = 0;
            for token in read_all_json::<ShareToken>(&dir)? {
                if token.expiry_ms <= now {
                    let key = file_key(&token.token)?;
                    if remove_optional(&dir.join(format!("{key}.json")))? {
                        removed += 1;
                    }
                }
            }
            Ok(removed)
        })
        .await
    }
}

#[async_trait]
impl BlobStore for FileStore {
    async fn put_blob(&self, id: &CredentialId, bytes: &[u8]) -> Result<()> {
        let id = id.clone();
        let bytes = bytes.to_vec();
        self.blocking(move |root| {
            let key = file_key(id.as_str())?;
            write_atomic(&root.join(BLOBS_DIR).join(format!("{key}.bin")), &bytes)
        })
        .await
    }

    async fn get_blob(&self, id: &CredentialId) -> Result<Option<Vec<u8>>> {
        let id = id.clone();
        self.blocking(move |root| {
            let key = file_key(id.as_str())?;
            read_optional(&root.join(BLOBS_DIR).join(format!("{key}.bin")))
        })
        .await
    }

    async fn delete_blob(&self, id: &CredentialId) -> Result<bool> {
        let id = id.clone();
        self.blocking(move |root| {
            let key = file_key(id.as_str())?;
            remove_optional(&root.join(BLOBS_DIR).join(format!("{key}.bin")))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, token};

    #[tokio::test]
    async fn test_credentials_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let r = record("c1", 1, 100);
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.save_credential(&r).await.unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.find_credential(&r.credential_id).await.unwrap(), Some(r.clone()));
        assert_eq!(store.find_credentials_by_user(UserId::new(1)).await.unwrap(), vec![r]);
        assert!(store
            .find_credentials_by_user(UserId::new(9))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_record_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save_credential(&record("c1", 4, 100)).await.unwrap();

        let raw = fs::read_to_string(dir.path().join("credentials/c1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["credentialId"], "c1");
        assert_eq!(value["userId"], 4);
        assert!(value["wrappedKeyBase64"].is_string());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = CredentialId::new("../escape");
        assert!(matches!(
            store.put_blob(&id, b"x").await,
            Err(StoreError::InvalidId(_))
        ));
        assert!(store.find_credential(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_tokens_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let live = token(10_000);
        let stale = token(500);
        store.save_token(&live).await.unwrap();
        store.save_token(&stale).await.unwrap();

        assert!(store.revoke_token(&live.token).await.unwrap());
        assert!(!store.revoke_token(&live.token).await.unwrap());
        assert!(store.find_token(&live.token).await.unwrap().unwrap().revoked);
        assert!(!store.revoke_token("0123456789abcdef0123456789abcdef").await.unwrap());

        assert_eq!(store.delete_expired_tokens(1000).await.unwrap(), 1);
        assert!(store.find_token(&stale.token).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let t = token(10_000);
        store.save_token(&t).await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            let t = t.clone();
            tasks.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    store.save_token(&t).await.map(|()| false)
                } else {
                    store.revoke_token(&t.token).await
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(store.find_token(&t.token).await.unwrap().is_some());
        let leftovers: Vec<_> = fs::read_dir(dir.path().join(TOKENS_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "{leftovers:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_revoke_flips_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let t = token(10_000);
        store.save_token(&t).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let secret = t.token.clone();
            tasks.push(tokio::spawn(async move { store.revoke_token(&secret).await }));
        }
        let mut flipped = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                flipped += 1;
            }
        }
        assert_eq!(flipped, 1);
    }

    #[tokio::test]
    async fn test_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = CredentialId::generate();
        store.put_blob(&id, &[0, 1, 2, 255]).await.unwrap();
        assert_eq!(store.get_blob(&id).await.unwrap().unwrap(), vec![0, 1, 2, 255]);
        assert!(store.delete_blob(&id).await.unwrap());
        assert!(!store.delete_blob(&id).await.unwrap());
    }
}
