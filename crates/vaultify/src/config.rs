//! Vault configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vaultify_ledger::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

/// Where credential metadata, tokens and ciphertext live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Nothing persisted; the ledger is kept in memory too.
    Memory,
    /// One JSON file per record under `<data_dir>/store`.
    #[default]
    File,
    /// SQLite database at `<data_dir>/vault.db`.
    Sqlite,
    /// SQLite primary mirrored into the file store.
    Dual,
}

/// Configuration for the Vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root of all persisted state.
    pub data_dir: PathBuf,
    /// Ledger snapshot file.
    pub ledger_path: PathBuf,
    /// Directory that receives certificate artifacts.
    pub certificates_dir: PathBuf,
    /// Storage backend, resolved once at open.
    pub storage: StorageMode,
    /// Number of ledger append workers.
    pub ledger_workers: usize,
    /// Bound on queued ledger appends.
    pub ledger_queue_capacity: usize,
    /// Lifetime of a share when the caller does not pick one.
    pub default_share_hours: i64,
}

impl VaultConfig {
    /// Configuration with every path under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            ledger_path: data_dir.join("ledger.json"),
            certificates_dir: data_dir.join("certificates"),
            storage: StorageMode::default(),
            ledger_workers: DEFAULT_WORKERS,
            ledger_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            default_share_hours: 24,
            data_dir,
        }
    }

    pub fn storage(mut self, mode: StorageMode) -> Self {
        self.storage = mode;
        self
    }

    /// Root of the file-backed store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vault.db")
    }

    /// Path a certificate artifact with this file name is written to.
    pub fn certificate_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.certificates_dir.join(file_name)
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::with_data_dir("vault_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_data_dir() {
        let config = VaultConfig::with_data_dir("/tmp/v");
        assert_eq!(config.ledger_path, Path::new("/tmp/v/ledger.json"));
        assert_eq!(config.certificates_dir, Path::new("/tmp/v/certificates"));
        assert_eq!(config.database_path(), Path::new("/tmp/v/vault.db"));
        assert_eq!(config.ledger_workers, 4);
        assert_eq!(config.ledger_queue_capacity, 64);
        assert_eq!(config.default_share_hours, 24);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"storage": "sqlite", "ledger_workers": 2}"#).unwrap();
        assert_eq!(config.storage, StorageMode::Sqlite);
        assert_eq!(config.ledger_workers, 2);
        assert_eq!(config.data_dir, Path::new("vault_data"));
    }
}
