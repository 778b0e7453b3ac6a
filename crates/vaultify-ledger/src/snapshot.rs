//! Snapshot persistence for the ledger.
//!
//! The whole chain is rewritten on every append. The file snapshot stages the
//! new content in a sibling temp file and renames it over the target, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use vaultify_core::LedgerEntry;

use crate::error::{LedgerError, Result};

/// Where the ledger persists its chain.
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted chain. `None` means nothing has been persisted yet.
    fn load(&self) -> Result<Option<Vec<LedgerEntry>>>;

    /// Replace the persisted chain.
    fn save(&self, entries: &[LedgerEntry]) -> Result<()>;
}

/// Pretty-printed JSON array of entries in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl SnapshotStore for JsonFileSnapshot {
    fn load(&self) -> Result<Option<Vec<LedgerEntry>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| LedgerError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn save(&self, entries: &[LedgerEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        let staged = (|| {
            let mut file = File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if staged.is_err() {
            let _ = fs::remove_file(&temp);
        }
        Ok(staged?)
    }
}

/// In-memory snapshot, for tests and ephemeral vaults.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    entries: Mutex<Option<Vec<LedgerEntry>>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing chain.
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: Mutex::new(Some(entries)),
        }
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load(&self) -> Result<Option<Vec<LedgerEntry>>> {
        let entries = self.entries.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(entries.clone())
    }

    fn save(&self, entries: &[LedgerEntry]) -> Result<()> {
        let mut stored = self.entries.lock().map_err(|_| LedgerError::Poisoned)?;
        *stored = Some(entries.to_vec());
        Ok(())
    }
}
