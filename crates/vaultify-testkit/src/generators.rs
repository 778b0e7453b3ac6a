//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vaultify_core::{CredentialId, LedgerAction, LedgerEvent, UserId};

pub fn user_id() -> impl Strategy<Value = UserId> {
    (1u64..10_000).prop_map(UserId::new)
}

/// Either a UUID-shaped or a legacy numeric credential id.
pub fn credential_id() -> impl Strategy<Value = CredentialId> {
    prop_oneof![
        "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}".prop_map(CredentialId::new),
        (1u64..1_000_000).prop_map(CredentialId::from),
    ]
}

/// A lowercase hex SHA-256 string.
pub fn hex_digest() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}"
}

/// A well-formed share token.
pub fn token() -> impl Strategy<Value = String> {
    "[0-9a-f]{32}"
}

/// Any action in the closed set, excluding genesis.
pub fn action() -> impl Strategy<Value = LedgerAction> {
    prop_oneof![
        Just(LedgerAction::AddCredential),
        Just(LedgerAction::DeleteCredential),
        Just(LedgerAction::GenerateToken),
        Just(LedgerAction::RevokeToken),
    ]
}

pub fn ledger_event() -> impl Strategy<Value = LedgerEvent> {
    prop_oneof![
        (credential_id(), user_id(), hex_digest()).prop_map(
            |(credential_id, user_id, content_hash)| LedgerEvent::AddCredential {
                credential_id,
                user_id,
                content_hash,
            }
        ),
        (credential_id(), user_id()).prop_map(|(credential_id, user_id)| {
            LedgerEvent::DeleteCredential {
                credential_id,
                user_id,
            }
        }),
        hex_digest().prop_map(|payload_hash| LedgerEvent::GenerateToken { payload_hash }),
        token().prop_map(|token| LedgerEvent::RevokeToken { token }),
    ]
}

/// Plaintext bytes up to `max_len` long.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Certificate lifetimes, including values that get clamped.
pub fn expiry_hours() -> impl Strategy<Value = i64> {
    -24i64..=24 * 30
}
