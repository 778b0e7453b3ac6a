//! Cryptographic primitives: SHA-256 hashing and RSA identity keys.
//!
//! Identity keys serve two roles. As issuer keys they sign certificate payload
//! hashes (PKCS#1 v1.5 over SHA-256). As recipient keys they wrap content keys
//! (OAEP, see `vaultify-envelope`).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// Smallest accepted RSA modulus. OAEP(SHA-256) wrapping of a 32-byte key
/// needs 98 bytes; 2048 bits is the documented floor.
pub const MIN_MODULUS_BITS: usize = 2048;

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::MalformedHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::MalformedHex("expected 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// SHA-256 of `data`, lowercase hex.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    Sha256Hash::hash(data.as_ref()).to_hex()
}

/// An RSA public key with at least [`MIN_MODULUS_BITS`] of modulus.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Wrap an RSA public key, rejecting undersized moduli.
    pub fn from_rsa(key: RsaPublicKey) -> Result<Self> {
        let bits = key.size() * 8;
        if bits < MIN_MODULUS_BITS {
            return Err(CoreError::KeyTooSmall {
                bits,
                minimum: MIN_MODULUS_BITS,
            });
        }
        Ok(Self(key))
    }

    /// Parse an SPKI PEM ("BEGIN PUBLIC KEY").
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key =
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Self::from_rsa(key)
    }

    /// Encode as SPKI PEM.
    pub fn to_pem(&self) -> Result<String> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Get the underlying RSA key.
    pub fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.0.size() * 8
    }

    /// Verify a PKCS#1 v1.5 / SHA-256 signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key = VerifyingKey::<Sha256>::new(self.0.clone());
        let sig = RsaSignature::try_from(signature.as_bytes())
            .map_err(|_| CoreError::InvalidSignature)?;
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(rsa-{})", self.modulus_bits())
    }
}

/// An RSA signature (raw bytes; base64 in artifacts).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard (padded) base64 encoding.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Parse standard base64.
    pub fn from_base64(s: &str) -> Result<Self> {
        STANDARD
            .decode(s.trim())
            .map(Self)
            .map_err(|e| CoreError::Decoding(e.to_string()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_base64();
        write!(f, "Sig({}...)", &b64[..b64.len().min(12)])
    }
}

/// An RSA identity keypair.
#[derive(Clone)]
pub struct Keypair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl Keypair {
    /// Generate a new random 2048-bit keypair.
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(MIN_MODULUS_BITS)
    }

    /// Generate a new random keypair with the given modulus size.
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        if bits < MIN_MODULUS_BITS {
            return Err(CoreError::KeyTooSmall {
                bits,
                minimum: MIN_MODULUS_BITS,
            });
        }
        let mut rng = rand::thread_rng();
        let private =
            RsaPrivateKey::new(&mut rng, bits).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Self::from_rsa(private)
    }

    /// Wrap an existing RSA private key.
    pub fn from_rsa(private: RsaPrivateKey) -> Result<Self> {
        let public = PublicKey::from_rsa(RsaPublicKey::from(&private))?;
        Ok(Self { private, public })
    }

    /// Parse a PKCS#8 PEM ("BEGIN PRIVATE KEY").
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let private =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Self::from_rsa(private)
    }

    /// Encode the private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Get the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Get the underlying RSA private key.
    pub fn as_rsa(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Sign a message (PKCS#1 v1.5 over SHA-256).
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let signing_key = SigningKey::<Sha256>::new(self.private.clone());
        let sig = signing_key
            .try_sign(message)
            .map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Ok(Signature(sig.to_vec()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public)
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
    fn test_sha256_known_vectors() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("GENESIS"),
            "901131d838b17aac0f7885b81e03cbdc9f5157a00343d30ab22083685ed1416a"
        );
    }

    #[test]
    fn test_sha256_hex_roundtrip() {
        let h = Sha256Hash::hash(b"hello");
        assert_eq!(Sha256Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert!(Sha256Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_sign_verify() {
        let keypair = keypair();
        let message = b"hello world";
        let signature = keypair.sign(message).unwrap();

        keypair.public_key().verify(message, &signature).unwrap();

        let tampered = b"hello worlD";
        assert!(keypair.public_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let keypair = keypair();
        let a = keypair.sign(b"payload").unwrap();
        let b = keypair.sign(b"payload").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let keypair = keypair();
        let garbage = Signature::from_bytes(vec![0u8; 7]);
        assert!(matches!(
            keypair.public_key().verify(b"x", &garbage),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_base64_roundtrip() {
        let sig = keypair().sign(b"abc").unwrap();
        let recovered = Signature::from_base64(&sig.to_base64()).unwrap();
        assert_eq!(sig, recovered);
        assert!(Signature::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_pem_roundtrip() {
        let keypair = keypair();
        let public_pem = keypair.public_key().to_pem().unwrap();
        assert!(public_pem.contains("BEGIN PUBLIC KEY"));
        assert_eq!(&PublicKey::from_pem(&public_pem).unwrap(), keypair.public_key());

        let private_pem = keypair.to_pkcs8_pem().unwrap();
        let recovered = Keypair::from_pkcs8_pem(&private_pem).unwrap();
        assert_eq!(recovered.public_key(), keypair.public_key());
    }

    #[test]
    fn test_small_modulus_rejected() {
        assert!(matches!(
            Keypair::generate_with_bits(1024),
            Err(CoreError::KeyTooSmall { bits: 1024, .. })
        ));

        let small = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        assert!(PublicKey::from_rsa(RsaPublicKey::from(&small)).is_err());
    }
}
