//! Hash-chain integrity verification.
//!
//! Verification is advisory and exhaustive: every violation in the chain is
//! reported, nothing is repaired.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entry::{LedgerEntry, GENESIS_PREV_HASH};

/// What went wrong at a given index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// There are no entries at all.
    EmptyChain,

    /// Entry 0 does not carry the `"0"` sentinel.
    GenesisPrevHash { found: String },

    /// `prevHash` does not match the predecessor's hash.
    PrevHashMismatch { expected: String, found: String },

    /// The stored hash does not match the recomputed hash.
    HashMismatch { expected: String, found: String },

    /// The stored index is not the entry's position.
    IndexMismatch { expected: u64, found: u64 },
}

/// A single integrity problem discovered during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    /// Position of the offending entry in the chain.
    pub index: u64,
    pub kind: ViolationKind,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::EmptyChain => write!(f, "Ledger is empty"),
            ViolationKind::GenesisPrevHash { found } => {
                write!(f, "Block 0: genesis prevHash should be \"0\", found {found}")
            }
            ViolationKind::PrevHashMismatch { expected, found } => write!(
                f,
                "Block {}: prevHash mismatch (expected {expected}, found {found})",
                self.index
            ),
            ViolationKind::HashMismatch { expected, found } => write!(
                f,
                "Block {}: hash mismatch (expected {expected}, found {found})",
                self.index
            ),
            ViolationKind::IndexMismatch { expected, found } => write!(
                f,
                "Block {}: index mismatch (expected {expected}, found {found})",
                self.index
            ),
        }
    }
}

/// Verify a chain, collecting all violations. Empty result means valid.
pub fn verify_chain(entries: &[LedgerEntry]) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    if entries.is_empty() {
        violations.push(IntegrityViolation {
            index: 0,
            kind: ViolationKind::EmptyChain,
        });
        return violations;
    }

    for (position, entry) in entries.iter().enumerate() {
        let position = position as u64;

        if entry.index != position {
            violations.push(IntegrityViolation {
                index: position,
                kind: ViolationKind::IndexMismatch {
                    expected: position,
                    found: entry.index,
                },
            });
        }

        if position == 0 {
            if entry.prev_hash != GENESIS_PREV_HASH {
                violations.push(IntegrityViolation {
                    index: 0,
                    kind: ViolationKind::GenesisPrevHash {
                        found: entry.prev_hash.clone(),
                    },
                });
            }
        } else {
            let previous = &entries[position as usize - 1];
            if entry.prev_hash != previous.hash {
                violations.push(IntegrityViolation {
                    index: position,
                    kind: ViolationKind::PrevHashMismatch {
                        expected: previous.hash.clone(),
                        found: entry.prev_hash.clone(),
                    },
                });
            }
        }

        let recomputed = entry.compute_hash();
        if recomputed != entry.hash {
            violations.push(IntegrityViolation {
                index: position,
                kind: ViolationKind::HashMismatch {
                    expected: recomputed,
                    found: entry.hash.clone(),
                },
            });
        }
    }

    violations
}
