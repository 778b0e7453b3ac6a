//! Credential metadata records.

use serde::{Deserialize, Serialize};

use crate::types::{CredentialId, UserId};

/// The AEAD used to seal a credential's content.
///
/// Records written before the cipher was recorded default to AES-256-GCM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentCipher {
    #[default]
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
    #[serde(rename = "ChaCha20-Poly1305")]
    ChaCha20Poly1305,
}

impl ContentCipher {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCipher::Aes256Gcm => "AES-256-GCM",
            ContentCipher::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    /// Parse the stored name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "AES-256-GCM" => Some(ContentCipher::Aes256Gcm),
            "ChaCha20-Poly1305" => Some(ContentCipher::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Metadata for one encrypted credential.
///
/// The ciphertext itself lives in a blob store keyed by `credential_id`. The
/// record is immutable after creation; deletion removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub credential_id: CredentialId,
    pub user_id: UserId,
    pub filename: String,

    /// Content key wrapped with the owner's public key (RSA-OAEP).
    #[serde(rename = "wrappedKeyBase64", with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,

    #[serde(rename = "ivBase64", with = "base64_bytes")]
    pub iv: Vec<u8>,

    /// Hex SHA-256 of the plaintext.
    pub content_hash: String,

    /// Plaintext length in bytes.
    pub file_size: u64,

    /// Creation time (ms since epoch).
    pub timestamp: i64,

    #[serde(default)]
    pub cipher: ContentCipher,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CredentialRecord {
        CredentialRecord {
            credential_id: CredentialId::new("c-1"),
            user_id: UserId::new(3),
            filename: "github.txt".into(),
            wrapped_key: vec![1, 2, 3, 4],
            iv: vec![9; 12],
            content_hash: "ab".repeat(32),
            file_size: 17,
            timestamp: 1_700_000_000_000,
            cipher: ContentCipher::Aes256Gcm,
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["credentialId"], "c-1");
        assert_eq!(json["userId"], 3);
        assert_eq!(json["wrappedKeyBase64"], "AQIDBA==");
        assert_eq!(json["ivBase64"], "CQkJCQkJCQkJCQkJ");
        assert_eq!(json["fileSize"], 17);
        assert_eq!(json["cipher"], "AES-256-GCM");
    }

    #[test]
    fn test_legacy_record_without_cipher() {
        let mut json = serde_json::to_value(record()).unwrap();
        json.as_object_mut().unwrap().remove("cipher");
        let parsed: CredentialRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.cipher, ContentCipher::Aes256Gcm);
        assert_eq!(parsed, record());
    }

    #[test]
    fn test_bad_base64_rejected() {
        let mut json = serde_json::to_value(record()).unwrap();
        json["ivBase64"] = "!!".into();
        assert!(serde_json::from_value::<CredentialRecord>(json).is_err());
    }

    #[test]
    fn test_cipher_names() {
        for cipher in [ContentCipher::Aes256Gcm, ContentCipher::ChaCha20Poly1305] {
            assert_eq!(ContentCipher::parse(cipher.as_str()), Some(cipher));
        }
        assert_eq!(ContentCipher::parse("DES"), None);
    }
}
