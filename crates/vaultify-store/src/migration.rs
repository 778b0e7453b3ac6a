//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the schema
//! from version N to N+1 inside one transaction.

use rusqlite::Connection;

use vaultify_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "migrated vault database");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE credentials (
            credential_id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            wrapped_key BLOB NOT NULL,        -- RSA-OAEP wrapped content key
            iv BLOB NOT NULL,                 -- 12 bytes
            content_hash TEXT NOT NULL,       -- hex SHA-256 of plaintext
            file_size INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,       -- Unix ms
            cipher TEXT NOT NULL DEFAULT 'AES-256-GCM'
        );

        CREATE TABLE share_tokens (
            token TEXT PRIMARY KEY,           -- 32 lowercase hex chars
            issuer_id INTEGER NOT NULL,
            credential_id TEXT NOT NULL,
            expiry_ms INTEGER NOT NULL,
            revoked INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE blobs (
            credential_id TEXT PRIMARY KEY,
            data BLOB NOT NULL
        );

        CREATE INDEX idx_credentials_user ON credentials(user_id, timestamp);
        CREATE INDEX idx_tokens_expiry ON share_tokens(expiry_ms);
        "#,
    )?;

    Ok(())
}
