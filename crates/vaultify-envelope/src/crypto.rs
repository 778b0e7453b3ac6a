//! Symmetric content encryption.
//!
//! Every credential is sealed under its own random 256-bit key with a 96-bit
//! random IV. Both supported AEADs append a 128-bit tag to the ciphertext.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::fmt;

use vaultify_core::ContentCipher;

use crate::error::{EnvelopeError, Result};

/// Content key size in bytes.
pub const KEY_LEN: usize = 32;

/// IV size in bytes.
pub const IV_LEN: usize = 12;

/// Authentication tag size in bytes.
pub const TAG_LEN: usize = 16;

/// A 256-bit symmetric content key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| EnvelopeError::InvalidLength {
            what: "content key",
            expected: KEY_LEN,
            found: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encrypt plaintext under a fresh random IV.
    pub fn encrypt(&self, cipher: ContentCipher, plaintext: &[u8]) -> Result<(Vec<u8>, ContentIv)> {
        let iv = ContentIv::generate();
        let ciphertext = self.encrypt_with_iv(cipher, plaintext, &iv)?;
        Ok((ciphertext, iv))
    }

    /// Encrypt with a caller-chosen IV. The IV must never repeat under one key.
    pub fn encrypt_with_iv(
        &self,
        cipher: ContentCipher,
        plaintext: &[u8],
        iv: &ContentIv,
    ) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(&iv.0);
        let sealed = match cipher {
            ContentCipher::Aes256Gcm => Aes256Gcm::new_from_slice(&self.0)
                .map_err(|e| EnvelopeError::Cryptographic(e.to_string()))?
                .encrypt(nonce, plaintext),
            ContentCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.0)
                .map_err(|e| EnvelopeError::Cryptographic(e.to_string()))?
                .encrypt(nonce, plaintext),
        };
        sealed.map_err(|_| EnvelopeError::Cryptographic("encryption failed".into()))
    }

    /// Decrypt and authenticate. Fails on any tag mismatch.
    pub fn decrypt(
        &self,
        cipher: ContentCipher,
        ciphertext: &[u8],
        iv: &ContentIv,
    ) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LEN {
            return Err(EnvelopeError::Cryptographic(
                "ciphertext shorter than authentication tag".into(),
            ));
        }
        let nonce = Nonce::from_slice(&iv.0);
        let opened = match cipher {
            ContentCipher::Aes256Gcm => Aes256Gcm::new_from_slice(&self.0)
                .map_err(|e| EnvelopeError::Cryptographic(e.to_string()))?
                .decrypt(nonce, ciphertext),
            ContentCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.0)
                .map_err(|e| EnvelopeError::Cryptographic(e.to_string()))?
                .decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| EnvelopeError::Cryptographic("authentication tag mismatch".into()))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// A 96-bit initialization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentIv(pub [u8; IV_LEN]);

impl ContentIv {
    /// Generate a new random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IV_LEN] = bytes.try_into().map_err(|_| EnvelopeError::InvalidLength {
            what: "IV",
            expected: IV_LEN,
            found: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

/// Hex SHA-256 of plaintext, stored for drift detection.
pub fn compute_content_hash(plaintext: &[u8]) -> String {
    vaultify_core::sha256_hex(plaintext)
}
