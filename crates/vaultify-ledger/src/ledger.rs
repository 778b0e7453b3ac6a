//! The ledger: single owner of the in-memory chain and its snapshot.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use vaultify_core::{
    now_millis, verify_chain, IntegrityViolation, LedgerAction, LedgerEntry, LedgerEvent,
    GENESIS_PREV_HASH,
};

use crate::error::{LedgerError, Result};
use crate::snapshot::{JsonFileSnapshot, MemorySnapshot, SnapshotStore};

/// Append-only, hash-chained action log.
///
/// Every mutation goes through [`Ledger::append`], which holds the lock across
/// both the in-memory push and the snapshot rewrite. A slow disk therefore
/// blocks every other ledger call; the chain is low-throughput by nature.
pub struct Ledger {
    entries: Mutex<Vec<LedgerEntry>>,
    snapshot: Box<dyn SnapshotStore>,
}

impl Ledger {
    /// Open a ledger persisted as a JSON file at `path`.
    ///
    /// Creates and persists a genesis entry if the file is missing or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(Box::new(JsonFileSnapshot::new(path.as_ref())))
    }

    /// Open an ephemeral in-memory ledger.
    pub fn in_memory() -> Result<Self> {
        Self::open_with(Box::new(MemorySnapshot::new()))
    }

    /// Open a ledger over any snapshot store.
    pub fn open_with(snapshot: Box<dyn SnapshotStore>) -> Result<Self> {
        let entries = match snapshot.load()? {
            Some(entries) if !entries.is_empty() => {
                tracing::info!(entries = entries.len(), "loaded ledger");
                let violations = verify_chain(&entries);
                if !violations.is_empty() {
                    tracing::warn!(
                        violations = violations.len(),
                        "loaded ledger fails integrity check"
                    );
                }
                entries
            }
            _ => {
                let genesis = LedgerEntry::genesis(now_millis());
                let entries = vec![genesis];
                snapshot.save(&entries)?;
                tracing::info!(hash = %entries[0].hash, "created genesis entry");
                entries
            }
        };

        Ok(Self {
            entries: Mutex::new(entries),
            snapshot,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LedgerEntry>>> {
        self.entries.lock().map_err(|_| LedgerError::Poisoned)
    }

    /// Append an entry stamped with the current time.
    pub fn append(
        &self,
        action: impl Into<LedgerAction>,
        data_hash: impl Into<String>,
    ) -> Result<LedgerEntry> {
        self.append_at(action, data_hash, now_millis())
    }

    /// Append an entry with an explicit timestamp.
    ///
    /// If the snapshot cannot be written the entry is removed again, so the
    /// in-memory chain never runs ahead of what is persisted.
    pub fn append_at(
        &self,
        action: impl Into<LedgerAction>,
        data_hash: impl Into<String>,
        timestamp: i64,
    ) -> Result<LedgerEntry> {
        let action = action.into();
        let mut entries = self.lock()?;

        let entry = match entries.last() {
            Some(last) => last.successor(timestamp, action, data_hash),
            None => LedgerEntry::new(0, timestamp, action, data_hash, GENESIS_PREV_HASH),
        };
        entries.push(entry.clone());

        if let Err(e) = self.snapshot.save(&entries) {
            entries.pop();
            tracing::warn!(index = entry.index, error = %e, "ledger snapshot write failed");
            return Err(e);
        }

        tracing::debug!(index = entry.index, action = %entry.action, "ledger append");
        Ok(entry)
    }

    /// Append a typed vault event.
    pub fn record(&self, event: &LedgerEvent) -> Result<LedgerEntry> {
        self.append(event.action(), event.data_hash())
    }

    /// Check the whole chain. Empty result means valid.
    pub fn verify_integrity(&self) -> Result<Vec<IntegrityViolation>> {
        let entries = self.lock()?;
        let violations = verify_chain(&entries);
        for violation in &violations {
            tracing::warn!(index = violation.index, "{violation}");
        }
        Ok(violations)
    }

    /// A copy of the chain. Mutating it does not affect the ledger.
    pub fn chain(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.lock()?.clone())
    }

    /// Number of entries, including genesis.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Hash of the latest entry.
    pub fn head_hash(&self) -> Result<Option<String>> {
        Ok(self.lock()?.last().map(|e| e.hash.clone()))
    }

    /// Find an entry by its hash.
    pub fn entry_by_hash(&self, hash: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.lock()?.iter().find(|e| e.hash == hash).cloned())
    }

    /// Get the entry at a position.
    pub fn entry_at(&self, index: u64) -> Result<Option<LedgerEntry>> {
        let entries = self.lock()?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| entries.get(i))
            .cloned())
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("Ledger").field("entries", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use vaultify_core::{sha256_hex, CredentialId, UserId};

    struct FlakySnapshot {
        inner: MemorySnapshot,
        fail: Arc<AtomicBool>,
    }

    impl SnapshotStore for FlakySnapshot {
        fn load(&self) -> Result<Option<Vec<LedgerEntry>>> {
            self.inner.load()
        }

        fn save(&self, entries: &[LedgerEntry]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.save(entries)
        }
    }

    #[test]
    fn test_open_creates_genesis() {
        let ledger = Ledger::in_memory().unwrap();
        let chain = ledger.chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].action, LedgerAction::Genesis);
        assert_eq!(chain[0].data_hash, sha256_hex("GENESIS"));
        assert_eq!(chain[0].prev_hash, "0");
        assert!(ledger.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_append_links_to_head() {
        let ledger = Ledger::in_memory().unwrap();
        let head = ledger.head_hash().unwrap().unwrap();

        let entry = ledger.append("ADD_CREDENTIAL", "h1").unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(entry.prev_hash, head);
        assert!(entry.has_valid_hash());
        assert_eq!(ledger.head_hash().unwrap(), Some(entry.hash.clone()));
    }

    #[test]
    fn test_scenario_three_entries() {
        let ledger = Ledger::in_memory().unwrap();
        ledger.append("ADD_CREDENTIAL", "h1").unwrap();
        ledger.append("GENERATE_TOKEN", "h2").unwrap();

        let chain = ledger.chain().unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2].prev_hash, chain[1].hash);
        assert!(ledger.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_chain_is_a_copy() {
        let ledger = Ledger::in_memory().unwrap();
        let mut copy = ledger.chain().unwrap();
        copy[0].hash = "tampered".into();
        copy.clear();

        assert_eq!(ledger.len().unwrap(), 1);
        assert!(ledger.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_record_event() {
        let ledger = Ledger::in_memory().unwrap();
        let event = LedgerEvent::AddCredential {
            credential_id: CredentialId::new("c1"),
            user_id: UserId::new(1),
            content_hash: "ff".into(),
        };
        let entry = ledger.record(&event).unwrap();
        assert_eq!(entry.action, LedgerAction::AddCredential);
        assert_eq!(entry.data_hash, event.data_hash());
    }

    #[test]
    fn test_lookups() {
        let ledger = Ledger::in_memory().unwrap();
        let entry = ledger.append("GENERATE_TOKEN", "p").unwrap();

        assert_eq!(ledger.entry_by_hash(&entry.hash).unwrap(), Some(entry.clone()));
        assert_eq!(ledger.entry_at(1).unwrap(), Some(entry));
        assert!(ledger.entry_at(2).unwrap().is_none());
        assert!(ledger.entry_by_hash("nope").unwrap().is_none());
    }

    #[test]
    fn test_failed_snapshot_rolls_back() {
        let fail = Arc::new(AtomicBool::new(false));
        let ledger = Ledger::open_with(Box::new(FlakySnapshot {
            inner: MemorySnapshot::new(),
            fail: fail.clone(),
        }))
        .unwrap();
        ledger.append("ADD_CREDENTIAL", "h1").unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            ledger.append("ADD_CREDENTIAL", "h2"),
            Err(LedgerError::Storage(_))
        ));
        assert_eq!(ledger.len().unwrap(), 2);

        fail.store(false, Ordering::SeqCst);
        let entry = ledger.append("ADD_CREDENTIAL", "h3").unwrap();
        assert_eq!(entry.index, 2);
        assert!(ledger.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let hash = {
            let ledger = Ledger::open(&path).unwrap();
            ledger.append("ADD_CREDENTIAL", "h1").unwrap().hash
        };

        let reopened = Ledger::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert_eq!(reopened.head_hash().unwrap(), Some(hash));
        assert!(reopened.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_tampered_file_is_detected_not_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.append("ADD_CREDENTIAL", "h1").unwrap();
        }

        let mut entries: Vec<LedgerEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        entries[1].data_hash = "forged".into();
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let ledger = Ledger::open(&path).unwrap();
        let violations = ledger.verify_integrity().unwrap();
        assert!(violations.iter().any(|v| v.index == 1));
        assert_eq!(ledger.chain().unwrap()[1].data_hash, "forged");
    }
}
