//! # Vaultify Envelope
//!
//! Hybrid envelope encryption for credential content.
//!
//! ## Overview
//!
//! Each credential is encrypted with a one-time 256-bit content key using an
//! AEAD (AES-256-GCM by default, ChaCha20-Poly1305 optionally). The content key
//! is then wrapped for the owner with RSA-OAEP(SHA-256), so only the holder of
//! the matching private key can recover it.
//!
//! All operations are stateless and safe to run in parallel.
//!
//! ## Usage
//!
//! ```ignore
//! use vaultify_envelope::SealedContent;
//!
//! let sealed = SealedContent::seal(b"secret", keypair.public_key())?;
//! let plaintext = sealed.open(&keypair)?;
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod wrap;

pub use crypto::{compute_content_hash, ContentIv, ContentKey, IV_LEN, KEY_LEN, TAG_LEN};
pub use envelope::SealedContent;
pub use error::{EnvelopeError, Result};
pub use wrap::{unwrap_key, wrap_key};

/// Generate a fresh random content key.
pub fn generate_content_key() -> ContentKey {
    ContentKey::generate()
}
