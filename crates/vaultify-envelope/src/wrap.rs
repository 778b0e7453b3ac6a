//! Asymmetric key wrapping (RSA-OAEP with SHA-256 and MGF1-SHA-256).

use rsa::Oaep;
use sha2::Sha256;

use vaultify_core::{Keypair, PublicKey};

use crate::crypto::{ContentKey, KEY_LEN};
use crate::error::{EnvelopeError, Result};

/// Wrap a content key for the holder of `recipient`'s private key.
pub fn wrap_key(key: &ContentKey, recipient: &PublicKey) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    recipient
        .as_rsa()
        .encrypt(&mut rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| EnvelopeError::Cryptographic(format!("key wrap failed: {e}")))
}

/// Recover a content key wrapped with [`wrap_key`].
pub fn unwrap_key(wrapped: &[u8], recipient: &Keypair) -> Result<ContentKey> {
    let bytes = recipient
        .as_rsa()
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|_| EnvelopeError::Cryptographic("key unwrap failed".into()))?;

    if bytes.len() != KEY_LEN {
        return Err(EnvelopeError::Cryptographic(format!(
            "unwrapped key has {} bytes, expected {KEY_LEN}",
            bytes.len()
        )));
    }
    ContentKey::from_slice(&bytes)
}
