//! Shared fixtures for backend tests.

use std::sync::OnceLock;

use vaultify_core::{ContentCipher, CredentialId, CredentialRecord, Keypair, ShareToken, UserId};

pub fn record(id: &str, user: u64, timestamp: i64) -> CredentialRecord {
    CredentialRecord {
        credential_id: CredentialId::new(id),
        user_id: UserId::new(user),
        filename: format!("{id}.txt"),
        wrapped_key: vec![7; 256],
        iv: vec![1; 12],
        content_hash: "ab".repeat(32),
        file_size: 42,
        timestamp,
        cipher: ContentCipher::Aes256Gcm,
    }
}

pub fn token(expiry_ms: i64) -> ShareToken {
    ShareToken::generate(UserId::new(1), CredentialId::new("c1"), expiry_ms, 0)
}

pub fn keypair() -> &'static Keypair {
    static KEY: OnceLock<Keypair> = OnceLock::new();
    KEY.get_or_init(|| Keypair::generate().unwrap())
}
