//! Ledger entries: the immutable links of the audit hash chain.
//!
//! Each entry commits to its own fields and to the hash of its predecessor:
//!
//! ```text
//! hash = sha256_hex(index | timestamp | action | dataHash | prevHash)
//! ```
//!
//! Fields are joined with a literal `|` in exactly that order. Entry 0 is the
//! genesis entry, whose `prevHash` is the sentinel `"0"`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::sha256_hex;
use crate::types::{CredentialId, UserId};

/// `prevHash` of the genesis entry.
pub const GENESIS_PREV_HASH: &str = "0";

/// Field separator in the entry hash preimage.
const FIELD_SEPARATOR: char = '|';

/// The action tag recorded in a ledger entry.
///
/// The set is closed. `Unrecognized` only exists so history written by other
/// tools loads and re-hashes bit-for-bit; the vault never emits it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LedgerAction {
    Genesis,
    AddCredential,
    DeleteCredential,
    GenerateToken,
    RevokeToken,
    Unrecognized(String),
}

impl LedgerAction {
    /// The wire tag, as it enters the hash preimage.
    pub fn as_str(&self) -> &str {
        match self {
            LedgerAction::Genesis => "GENESIS",
            LedgerAction::AddCredential => "ADD_CREDENTIAL",
            LedgerAction::DeleteCredential => "DELETE_CREDENTIAL",
            LedgerAction::GenerateToken => "GENERATE_TOKEN",
            LedgerAction::RevokeToken => "REVOKE_TOKEN",
            LedgerAction::Unrecognized(tag) => tag,
        }
    }

    /// Whether this is one of the known action tags.
    pub fn is_known(&self) -> bool {
        !matches!(self, LedgerAction::Unrecognized(_))
    }
}

impl From<String> for LedgerAction {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "GENESIS" => LedgerAction::Genesis,
            "ADD_CREDENTIAL" => LedgerAction::AddCredential,
            "DELETE_CREDENTIAL" => LedgerAction::DeleteCredential,
            "GENERATE_TOKEN" => LedgerAction::GenerateToken,
            "REVOKE_TOKEN" => LedgerAction::RevokeToken,
            _ => LedgerAction::Unrecognized(tag),
        }
    }
}

impl From<&str> for LedgerAction {
    fn from(tag: &str) -> Self {
        LedgerAction::from(tag.to_string())
    }
}

impl From<LedgerAction> for String {
    fn from(action: LedgerAction) -> Self {
        match action {
            LedgerAction::Unrecognized(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Debug for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed vault event, ready to be appended to the ledger.
///
/// Each variant carries the fields the event is about and derives the data
/// hash that gets committed into the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    AddCredential {
        credential_id: CredentialId,
        user_id: UserId,
        content_hash: String,
    },
    DeleteCredential {
        credential_id: CredentialId,
        user_id: UserId,
    },
    /// Share token issuance; the data hash is the certificate payload hash.
    GenerateToken { payload_hash: String },
    RevokeToken { token: String },
}

impl LedgerEvent {
    /// The action tag this event is recorded under.
    pub fn action(&self) -> LedgerAction {
        match self {
            LedgerEvent::AddCredential { .. } => LedgerAction::AddCredential,
            LedgerEvent::DeleteCredential { .. } => LedgerAction::DeleteCredential,
            LedgerEvent::GenerateToken { .. } => LedgerAction::GenerateToken,
            LedgerEvent::RevokeToken { .. } => LedgerAction::RevokeToken,
        }
    }

    /// The data hash committed into the entry.
    pub fn data_hash(&self) -> String {
        match self {
            LedgerEvent::AddCredential {
                credential_id,
                user_id,
                content_hash,
            } => sha256_hex(format!("ADD:{credential_id}:{user_id}:{content_hash}")),
            LedgerEvent::DeleteCredential {
                credential_id,
                user_id,
            } => sha256_hex(format!("DELETE:{credential_id}:{user_id}")),
            LedgerEvent::GenerateToken { payload_hash } => payload_hash.clone(),
            LedgerEvent::RevokeToken { token } => sha256_hex(format!("REVOKE:{token}")),
        }
    }
}

/// Compute the hash of an entry from its fields.
pub fn entry_hash(
    index: u64,
    timestamp: i64,
    action: &str,
    data_hash: &str,
    prev_hash: &str,
) -> String {
    let preimage = format!(
        "{index}{sep}{timestamp}{sep}{action}{sep}{data_hash}{sep}{prev_hash}",
        sep = FIELD_SEPARATOR
    );
    sha256_hex(preimage)
}

/// One immutable record in the audit log.
///
/// Serialized with camelCase field names; the persisted snapshot is a JSON
/// array of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// 0-based position in the chain.
    pub index: u64,

    /// Creation time (ms since epoch).
    pub timestamp: i64,

    pub action: LedgerAction,

    /// Hash describing the referenced payload.
    pub data_hash: String,

    /// Hash of the preceding entry, or `"0"` for genesis.
    pub prev_hash: String,

    /// This entry's own hash.
    pub hash: String,
}

impl LedgerEntry {
    /// Build an entry and compute its hash.
    pub fn new(
        index: u64,
        timestamp: i64,
        action: LedgerAction,
        data_hash: impl Into<String>,
        prev_hash: impl Into<String>,
    ) -> Self {
        let data_hash = data_hash.into();
        let prev_hash = prev_hash.into();
        let hash = entry_hash(index, timestamp, action.as_str(), &data_hash, &prev_hash);
        Self {
            index,
            timestamp,
            action,
            data_hash,
            prev_hash,
            hash,
        }
    }

    /// The genesis entry: index 0, data hash `H("GENESIS")`, prev hash `"0"`.
    pub fn genesis(timestamp: i64) -> Self {
        Self::new(
            0,
            timestamp,
            LedgerAction::Genesis,
            sha256_hex(LedgerAction::Genesis.as_str()),
            GENESIS_PREV_HASH,
        )
    }

    /// The entry that would follow `self`.
    pub fn successor(
        &self,
        timestamp: i64,
        action: LedgerAction,
        data_hash: impl Into<String>,
    ) -> Self {
        Self::new(self.index + 1, timestamp, action, data_hash, self.hash.clone())
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        entry_hash(
            self.index,
            self.timestamp,
            self.action.as_str(),
            &self.data_hash,
            &self.prev_hash,
        )
    }

    /// Whether the stored hash matches the fields.
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Whether this is the genesis entry.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}
