//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, OnceLock};

use tempfile::TempDir;

use vaultify::{StorageMode, Vault, VaultConfig};
use vaultify_core::{Keypair, UserId};
use vaultify_store::MemoryKeyProvider;

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Keypair of the fixture's credential owner, generated once per process.
pub fn issuer_keypair() -> &'static Keypair {
    static KEY: OnceLock<Keypair> = OnceLock::new();
    KEY.get_or_init(|| Keypair::generate().expect("generate issuer keypair"))
}

/// Keypair of a second user with no access to the owner's credentials.
pub fn outsider_keypair() -> &'static Keypair {
    static KEY: OnceLock<Keypair> = OnceLock::new();
    KEY.get_or_init(|| Keypair::generate().expect("generate outsider keypair"))
}

/// A vault in a scratch directory with two registered users.
///
/// Must be created from within a tokio runtime.
pub struct TestVault {
    pub vault: Vault,
    pub keys: Arc<MemoryKeyProvider>,
    /// Owner of credentials added in tests (user 7).
    pub owner: UserId,
    /// A user with keys but no credentials (user 8).
    pub outsider: UserId,
    pub dir: TempDir,
}

impl TestVault {
    pub fn new(storage: StorageMode) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = VaultConfig::with_data_dir(dir.path()).storage(storage);
        Self::with_config(config, dir)
    }

    /// Open a vault with `config`, keeping `dir` alive for its lifetime.
    pub fn with_config(config: VaultConfig, dir: TempDir) -> Self {
        init_tracing();
        let owner = UserId::new(7);
        let outsider = UserId::new(8);

        let keys = Arc::new(MemoryKeyProvider::new());
        keys.insert(owner, issuer_keypair().clone())
            .expect("register owner");
        keys.insert(outsider, outsider_keypair().clone())
            .expect("register outsider");

        let vault = Vault::open(config, keys.clone()).expect("open vault");
        Self {
            vault,
            keys,
            owner,
            outsider,
            dir,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StorageMode::Memory)
    }

    pub fn file_backed() -> Self {
        Self::new(StorageMode::File)
    }

    /// Config for reopening the same data directory.
    pub fn config(&self) -> VaultConfig {
        self.vault.config().clone()
    }
}
