//! Sealed credential content.
//!
//! A [`SealedContent`] is everything needed to recover a credential except the
//! recipient's private key: the AEAD ciphertext, its IV, and the content key
//! wrapped for the recipient.

use vaultify_core::{ContentCipher, CredentialId, CredentialRecord, Keypair, PublicKey, UserId};

use crate::crypto::{compute_content_hash, ContentIv, ContentKey};
use crate::error::{EnvelopeError, Result};
use crate::wrap::{unwrap_key, wrap_key};

/// Encrypted content plus the material needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    pub cipher: ContentCipher,
    pub iv: ContentIv,

    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,

    pub wrapped_key: Vec<u8>,

    /// Hex SHA-256 of the plaintext.
    pub content_hash: String,

    pub plaintext_len: u64,
}

impl SealedContent {
    /// Seal plaintext for `recipient` with AES-256-GCM.
    pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<Self> {
        Self::seal_with(ContentCipher::default(), plaintext, recipient)
    }

    /// Seal plaintext for `recipient` with a fresh one-time content key.
    pub fn seal_with(cipher: ContentCipher, plaintext: &[u8], recipient: &PublicKey) -> Result<Self> {
        let key = ContentKey::generate();
        let (ciphertext, iv) = key.encrypt(cipher, plaintext)?;
        let wrapped_key = wrap_key(&key, recipient)?;

        Ok(Self {
            cipher,
            iv,
            ciphertext,
            wrapped_key,
            content_hash: compute_content_hash(plaintext),
            plaintext_len: plaintext.len() as u64,
        })
    }

    /// Unwrap the content key and decrypt.
    pub fn open(&self, recipient: &Keypair) -> Result<Vec<u8>> {
        let key = unwrap_key(&self.wrapped_key, recipient)?;
        key.decrypt(self.cipher, &self.ciphertext, &self.iv)
    }

    /// Open and check the plaintext against the stored content hash.
    pub fn open_verified(&self, recipient: &Keypair) -> Result<Vec<u8>> {
        let plaintext = self.open(recipient)?;
        if compute_content_hash(&plaintext) != self.content_hash {
            return Err(EnvelopeError::Cryptographic(
                "content hash drift: plaintext does not match stored hash".into(),
            ));
        }
        Ok(plaintext)
    }

    /// Split into a metadata record and the ciphertext blob.
    pub fn into_record(
        self,
        credential_id: CredentialId,
        user_id: UserId,
        filename: impl Into<String>,
        timestamp: i64,
    ) -> (CredentialRecord, Vec<u8>) {
        let record = CredentialRecord {
            credential_id,
            user_id,
            filename: filename.into(),
            wrapped_key: self.wrapped_key,
            iv: self.iv.0.to_vec(),
            content_hash: self.content_hash,
            file_size: self.plaintext_len,
            timestamp,
            cipher: self.cipher,
        };
        (record, self.ciphertext)
    }

    /// Reassemble from a stored record and its ciphertext blob.
    pub fn from_record(record: &CredentialRecord, ciphertext: Vec<u8>) -> Result<Self> {
        Ok(Self {
            cipher: record.cipher,
            iv: ContentIv::from_slice(&record.iv)?,
            ciphertext,
            wrapped_key: record.wrapped_key.clone(),
            content_hash: record.content_hash.clone(),
            plaintext_len: record.file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn keypair() -> &'static Keypair {
        static KEY: OnceLock<Keypair> = OnceLock::new();
        KEY.get_or_init(|| Keypair::generate().unwrap())
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = SealedContent::seal(b"user: alice\npass: hunter2", keypair().public_key()).unwrap();
        assert_eq!(sealed.plaintext_len, 25);
        assert_eq!(sealed.open_verified(keypair()).unwrap(), b"user: alice\npass: hunter2");
    }

    #[test]
    fn test_chacha_seal() {
        let sealed = SealedContent::seal_with(
            ContentCipher::ChaCha20Poly1305,
            b"secret",
            keypair().public_key(),
        )
        .unwrap();
        assert_eq!(sealed.open(keypair()).unwrap(), b"secret");
    }

    #[test]
    fn test_record_roundtrip() {
        let sealed = SealedContent::seal(b"data", keypair().public_key()).unwrap();
        let (record, blob) = sealed.clone().into_record(
            CredentialId::new("c1"),
            UserId::new(1),
            "notes.txt",
            1000,
        );
        assert_eq!(record.file_size, 4);
        assert_eq!(record.iv.len(), 12);

        let restored = SealedContent::from_record(&record, blob).unwrap();
        assert_eq!(restored, sealed);
    }

    #[test]
    fn test_drift_detected() {
        let mut sealed = SealedContent::seal(b"data", keypair().public_key()).unwrap();
        sealed.content_hash = "00".repeat(32);
        assert!(sealed.open(keypair()).is_ok());
        assert!(sealed.open_verified(keypair()).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut sealed = SealedContent::seal(b"data", keypair().public_key()).unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(matches!(
            sealed.open(keypair()),
            Err(EnvelopeError::Cryptographic(_))
        ));
    }

    #[test]
    fn test_bad_record_iv() {
        let sealed = SealedContent::seal(b"data", keypair().public_key()).unwrap();
        let (mut record, blob) =
            sealed.into_record(CredentialId::new("c1"), UserId::new(1), "f", 0);
        record.iv.truncate(4);
        assert!(matches!(
            SealedContent::from_record(&record, blob),
            Err(EnvelopeError::InvalidLength { .. })
        ));
    }
}
