//! SQLite implementation of the repository traits.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use vaultify_core::{ContentCipher, CredentialId, CredentialRecord, ShareToken, UserId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BlobStore, CredentialRepository, TokenRepository};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, running migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

const CREDENTIAL_COLUMNS: &str = "credential_id, user_id, filename, wrapped_key, iv, \
                                  content_hash, file_size, timestamp, cipher";

fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<CredentialRecord> {
    let cipher_name: String = row.get("cipher")?;
    let cipher = ContentCipher::parse(&cipher_name).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown cipher {cipher_name:?}").into(),
        )
    })?;

    Ok(CredentialRecord {
        credential_id: CredentialId::new(row.get::<_, String>("credential_id")?),
        user_id: UserId::new(row.get::<_, i64>("user_id")? as u64),
        filename: row.get("filename")?,
        wrapped_key: row.get("wrapped_key")?,
        iv: row.get("iv")?,
        content_hash: row.get("content_hash")?,
        file_size: row.get::<_, i64>("file_size")? as u64,
        timestamp: row.get("timestamp")?,
        cipher,
    })
}

fn row_to_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShareToken> {
    Ok(ShareToken {
        token: row.get("token")?,
        issuer_id: UserId::new(row.get::<_, i64>("issuer_id")? as u64),
        credential_id: CredentialId::new(row.get::<_, String>("credential_id")?),
        expiry_ms: row.get("expiry_ms")?,
        revoked: row.get::<_, i64>("revoked")? != 0,
        created_at_ms: row.get("created_at_ms")?,
    })
}

#[async_trait]
impl CredentialRepository for SqliteStore {
    async fn save_credential(&self, record: &CredentialRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO credentials (
                    credential_id, user_id, filename, wrapped_key, iv,
                    content_hash, file_size, timestamp, cipher
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.credential_id.as_str(),
                    record.user_id.get() as i64,
                    record.filename,
                    record.wrapped_key,
                    record.iv,
                    record.content_hash,
                    record.file_size as i64,
                    record.timestamp,
                    record.cipher.as_str(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE credential_id = ?1"),
                params![id.as_str()],
                row_to_credential,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_credentials_by_user(&self, user: UserId) -> Result<Vec<CredentialRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credentials
                 WHERE user_id = ?1 ORDER BY timestamp, credential_id"
            ))?;
            let records = stmt
                .query_map(params![user.get() as i64], row_to_credential)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn delete_credential(&self, id: &CredentialId) -> Result<bool> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM credentials WHERE credential_id = ?1",
                params![id.as_str()],
            )?;
            Ok(n > 0)
        })
        .await
    }
}

#[async_trait]
impl TokenRepository for SqliteStore {
    async fn save_token(&self, token: &ShareToken) -> Result<()> {
        let token = token.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO share_tokens (
                    token, issuer_id, credential_id, expiry_ms, revoked, created_at_ms
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    token.token,
                    token.issuer_id.get() as i64,
                    token.credential_id.as_str(),
                    token.expiry_ms,
                    token.revoked as i64,
                    token.created_at_ms,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_token(&self, token: &str) -> Result<Option<ShareToken>> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT token, issuer_id, credential_id, expiry_ms, revoked, created_at_ms
                 FROM share_tokens WHERE token = ?1",
                params![token],
                row_to_token,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn revoke_token(&self, token: &str) -> Result<bool> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE share_tokens SET revoked = 1 WHERE token = ?1 AND revoked = 0",
                params![token],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<usize> {
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM share_tokens WHERE expiry_ms <= ?1",
                params![now],
            )?;
            Ok(n)
        })
        .await
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn put_blob(&self, id: &CredentialId, bytes: &[u8]) -> Result<()> {
        let id = id.clone();
        let bytes = bytes.to_vec();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO blobs (credential_id, data) VALUES (?1, ?2)",
                params![id.as_str(), bytes],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_blob(&self, id: &CredentialId) -> Result<Option<Vec<u8>>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT data FROM blobs WHERE credential_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_blob(&self, id: &CredentialId) -> Result<bool> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM blobs WHERE credential_id = ?1",
                params![id.as_str()],
            )?;
            Ok(n > 0)
        })
        .await
    }
}
