//! Key material providers.
//!
//! [`PemKeyProvider`] reads `<user>.pub.pem` (SPKI) and `<user>.key.pem`
//! (PKCS#8) from a directory. [`MemoryKeyProvider`] keeps keypairs in a map.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use vaultify_core::{Keypair, PublicKey, UserId};

use crate::error::{Result, StoreError};
use crate::traits::KeyProvider;

/// Keypairs held in memory.
#[derive(Default)]
pub struct MemoryKeyProvider {
    keys: RwLock<HashMap<UserId, Keypair>>,
}

impl MemoryKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a user's keypair.
    pub fn insert(&self, user: UserId, keypair: Keypair) -> Result<()> {
        self.keys
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(user, keypair);
        Ok(())
    }
}

#[async_trait]
impl KeyProvider for MemoryKeyProvider {
    async fn public_key(&self, user: UserId) -> Result<PublicKey> {
        Ok(self.keypair(user).await?.public_key().clone())
    }

    async fn keypair(&self, user: UserId) -> Result<Keypair> {
        self.keys
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("keys for user {user}")))
    }
}

/// PEM files in a directory.
#[derive(Debug, Clone)]
pub struct PemKeyProvider {
    dir: Arc<PathBuf>,
}

impl PemKeyProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    fn public_path(dir: &Path, user: UserId) -> PathBuf {
        dir.join(format!("{user}.pub.pem"))
    }

    fn private_path(dir: &Path, user: UserId) -> PathBuf {
        dir.join(format!("{user}.key.pem"))
    }

    /// Write a user's keypair as PEM files.
    pub fn store(&self, user: UserId, keypair: &Keypair) -> Result<()> {
        fs::create_dir_all(self.dir.as_path())?;
        fs::write(
            Self::public_path(&self.dir, user),
            keypair.public_key().to_pem()?,
        )?;
        fs::write(Self::private_path(&self.dir, user), keypair.to_pkcs8_pem()?)?;
        tracing::info!(%user, "stored key material");
        Ok(())
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || f(&dir))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e.to_string())))?
    }
}

fn read_pem(path: &Path, user: UserId) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(pem) => Ok(Some(pem)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            tracing::warn!(%user, path = %path.display(), error = %e, "failed to read key file");
            Err(e.into())
        }
    }
}

#[async_trait]
impl KeyProvider for PemKeyProvider {
    async fn public_key(&self, user: UserId) -> Result<PublicKey> {
        self.blocking(move |dir| {
            if let Some(pem) = read_pem(&Self::public_path(dir, user), user)? {
                return Ok(PublicKey::from_pem(&pem)?);
            }
            match read_pem(&Self::private_path(dir, user), user)? {
                Some(pem) => Ok(Keypair::from_pkcs8_pem(&pem)?.public_key().clone()),
                None => Err(StoreError::NotFound(format!("public key for user {user}"))),
            }
        })
        .await
    }

    async fn keypair(&self, user: UserId) -> Result<Keypair> {
        self.blocking(move |dir| match read_pem(&Self::private_path(dir, user), user)? {
            Some(pem) => Ok(Keypair::from_pkcs8_pem(&pem)?),
            None => Err(StoreError::NotFound(format!("private key for user {user}"))),
        })
        .await
    }
}
