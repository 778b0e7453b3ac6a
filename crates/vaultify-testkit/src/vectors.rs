//! Golden test vectors for deterministic verification.
//!
//! Entry hashes must match bit-for-bit across implementations, or previously
//! written ledgers stop verifying.

use vaultify_core::{entry_hash, LedgerAction, LedgerEntry, GENESIS_PREV_HASH};

/// A golden ledger entry.
#[derive(Debug, Clone)]
pub struct LedgerVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub index: u64,
    pub timestamp: i64,
    pub action: &'static str,
    pub data_hash: &'static str,
    pub prev_hash: &'static str,
    /// Expected entry hash (hex).
    pub expected_hash: &'static str,
}

impl LedgerVector {
    /// Build the entry the vector describes.
    pub fn entry(&self) -> LedgerEntry {
        LedgerEntry::new(
            self.index,
            self.timestamp,
            LedgerAction::from(self.action),
            self.data_hash,
            self.prev_hash,
        )
    }

    pub fn computed_hash(&self) -> String {
        entry_hash(
            self.index,
            self.timestamp,
            self.action,
            self.data_hash,
            self.prev_hash,
        )
    }
}

pub const GENESIS_HASH: &str = "d8f40ba43ad72bc0052053ac4db34a350324192c30b6df1c61eb4b4867a4c58a";
pub const ADD_HASH: &str = "4a2164c06a0d984dab4012f597ad67e9f8dad92bae931d56a1ba37a75e89ce87";
pub const GENERATE_HASH: &str = "94955ca1290220f8a98e69756dea934d6fed66a014770d6e51174130116f7b19";

/// Certificate payload `t1|7|42|1700003600000` and its hash.
pub const PAYLOAD: &str = "t1|7|42|1700003600000";
pub const PAYLOAD_HASH: &str = "35484f679f4fa587e6ba9d190e55d4e153ad5bb52f3f093fada97cceaa560db5";

/// A three-entry chain: genesis, `ADD_CREDENTIAL h1`, `GENERATE_TOKEN h2`.
pub fn ledger_vectors() -> Vec<LedgerVector> {
    vec![
        LedgerVector {
            name: "genesis",
            index: 0,
            timestamp: 1_700_000_000_000,
            action: "GENESIS",
            data_hash: "901131d838b17aac0f7885b81e03cbdc9f5157a00343d30ab22083685ed1416a",
            prev_hash: GENESIS_PREV_HASH,
            expected_hash: GENESIS_HASH,
        },
        LedgerVector {
            name: "add credential",
            index: 1,
            timestamp: 1_700_000_001_000,
            action: "ADD_CREDENTIAL",
            data_hash: "h1",
            prev_hash: GENESIS_HASH,
            expected_hash: ADD_HASH,
        },
        LedgerVector {
            name: "generate token",
            index: 2,
            timestamp: 1_700_000_002_000,
            action: "GENERATE_TOKEN",
            data_hash: "h2",
            prev_hash: ADD_HASH,
            expected_hash: GENERATE_HASH,
        },
    ]
}

/// Names of vectors whose computed hash differs from the expected one.
pub fn verify_ledger_vectors() -> Vec<&'static str> {
    ledger_vectors()
        .into_iter()
        .filter(|v| v.computed_hash() != v.expected_hash)
        .map(|v| v.name)
        .collect()
}
