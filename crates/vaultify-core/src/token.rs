//! Share tokens and their revocation/expiry policy.
//!
//! A token is a random opaque secret bound to an issuer, a credential and an
//! expiry. Its lifecycle is `Active -> {Revoked | Expired}`; both outcomes are
//! terminal. Revocation is not part of any signed payload, so it can only be
//! observed by consulting the live token state.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::{CredentialId, UserId};

/// Length of a token in hex characters (16 random bytes).
pub const TOKEN_HEX_LEN: usize = 32;

/// Current state of a share token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Active,
    Revoked,
    Expired,
}

impl TokenStatus {
    /// Check if the token may still be used.
    pub fn is_active(&self) -> bool {
        matches!(self, TokenStatus::Active)
    }
}

/// Why a token was refused by policy.
///
/// Distinct from cryptographic invalidity: a certificate can verify and still
/// be policy-denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyDenial {
    Revoked,
    Expired { expired_at_ms: i64 },
    Unknown,
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyDenial::Revoked => write!(f, "token revoked"),
            PolicyDenial::Expired { expired_at_ms } => {
                write!(f, "token expired at {expired_at_ms}")
            }
            PolicyDenial::Unknown => write!(f, "token not found"),
        }
    }
}

/// A one-time share secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareToken {
    pub token: String,
    pub issuer_id: UserId,
    pub credential_id: CredentialId,
    pub expiry_ms: i64,
    #[serde(default)]
    pub revoked: bool,
    pub created_at_ms: i64,
}

impl ShareToken {
    /// Issue a fresh token with a random secret.
    pub fn generate(
        issuer_id: UserId,
        credential_id: CredentialId,
        expiry_ms: i64,
        now: i64,
    ) -> Self {
        let mut bytes = [0u8; TOKEN_HEX_LEN / 2];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            issuer_id,
            credential_id,
            expiry_ms,
            revoked: false,
            created_at_ms: now,
        }
    }

    /// Status at the given time. Revocation takes precedence over expiry.
    pub fn status(&self, now: i64) -> TokenStatus {
        if self.revoked {
            TokenStatus::Revoked
        } else if now >= self.expiry_ms {
            TokenStatus::Expired
        } else {
            TokenStatus::Active
        }
    }

    /// Check the token against policy at the given time.
    pub fn check(&self, now: i64) -> std::result::Result<(), PolicyDenial> {
        match self.status(now) {
            TokenStatus::Active => Ok(()),
            TokenStatus::Revoked => Err(PolicyDenial::Revoked),
            TokenStatus::Expired => Err(PolicyDenial::Expired {
                expired_at_ms: self.expiry_ms,
            }),
        }
    }

    /// Mark revoked. Returns false if it already was.
    pub fn revoke(&mut self) -> bool {
        !std::mem::replace(&mut self.revoked, true)
    }

    /// Short prefix of the secret, safe for logs.
    pub fn redacted(&self) -> &str {
        &self.token[..self.token.len().min(6)]
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareToken")
            .field("token", &format_args!("{}...", self.redacted()))
            .field("issuer_id", &self.issuer_id)
            .field("credential_id", &self.credential_id)
            .field("expiry_ms", &self.expiry_ms)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// Validate that a token string is 32 lowercase hex characters.
pub fn validate_token_format(token: &str) -> Result<()> {
    if token.len() != TOKEN_HEX_LEN {
        return Err(CoreError::MalformedToken(format!(
            "expected {TOKEN_HEX_LEN} characters, found {}",
            token.len()
        )));
    }
    if !token
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(CoreError::MalformedToken(
            "expected lowercase hex characters".into(),
        ));
    }
    Ok(())
}
