//! # Vaultify Ledger
//!
//! Append-only, tamper-evident audit log.
//!
//! ## Overview
//!
//! The [`Ledger`] owns the in-memory chain and its persisted snapshot. All
//! mutation happens in [`Ledger::append`], which serializes callers on one
//! lock and rewrites the full snapshot before returning. Integrity checking is
//! advisory: [`Ledger::verify_integrity`] reports every broken link or hash and
//! never repairs anything.
//!
//! [`LedgerWriter`] puts a bounded worker pool in front of the ledger so that
//! callers can enqueue appends without waiting on disk.
//!
//! ## Persisted Format
//!
//! A JSON array of entries with fields `index`, `timestamp`, `action`,
//! `dataHash`, `prevHash`, `hash`, rewritten atomically on every append.

pub mod error;
pub mod ledger;
pub mod snapshot;
pub mod writer;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use snapshot::{JsonFileSnapshot, MemorySnapshot, SnapshotStore};
pub use writer::{LedgerWriter, PendingAppend, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
