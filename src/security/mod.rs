//! Encryption for persisted session data
//!
//! Uses a local key file instead of the OS keychain so unattended runs never
//! block on a password prompt.

mod encryption;
mod file_storage;

use crate::error::Result;
use std::path::PathBuf;

pub use encryption::{EncryptionManager, SealedValue};
pub(crate) use file_storage::restrict_permissions;

pub struct SecurityManager {
    encryption: EncryptionManager,
}

impl SecurityManager {
    /// Security manager keyed from `secrets.dat` in `config_dir`
    pub fn new(config_dir: PathBuf) -> Result<Self> {
        let storage = file_storage::FileStorage::new(config_dir);
        let master_key = storage.get_or_create_master_key()?;

        Ok(Self {
            encryption: EncryptionManager::new(&master_key)?,
        })
    }

    /// Security manager under a freshly generated key, overwriting
    /// `secrets.dat`. Values sealed under the previous key are lost.
    pub fn regenerate(config_dir: PathBuf) -> Result<Self> {
        let master_key = file_storage::FileStorage::new(config_dir).create_master_key()?;

        Ok(Self {
            encryption: EncryptionManager::new(&master_key)?,
        })
    }

    /// Security manager with an explicit key
    pub fn with_key(key: &[u8]) -> Result<Self> {
        Ok(Self {
            encryption: EncryptionManager::new(key)?,
        })
    }

    pub fn seal(&self, plaintext: &str) -> Result<SealedValue> {
        self.encryption.seal(plaintext)
    }

    pub fn open(&self, sealed: &SealedValue) -> Result<String> {
        self.encryption.open(sealed)
    }
}
