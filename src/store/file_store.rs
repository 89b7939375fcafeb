//! Encrypted JSON file store

use super::TokenStore;
use crate::error::{AppError, Result};
use crate::security::{restrict_permissions, SealedValue, SecurityManager};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const STORE_FILE: &str = "session.json";

type Entries = BTreeMap<String, SealedValue>;

/// Values sealed with AES-256-GCM in `session.json`.
///
/// The master key is loaded on first use. An unreadable key or store file
/// fails reads, while writes replace them so a fresh login can recover.
pub struct FileStore {
    data_dir: PathBuf,
    path: PathBuf,
    // Also serializes read-modify-write cycles within the process
    security: Mutex<Option<SecurityManager>>,
}

impl FileStore {
    /// Store in `data_dir`, keyed by the master key kept beside it
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
            data_dir,
            security: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_security<'a>(
        &self,
        slot: &'a mut Option<SecurityManager>,
    ) -> Result<&'a SecurityManager> {
        if slot.is_none() {
            *slot = Some(SecurityManager::new(self.data_dir.clone())?);
        }
        slot.as_ref()
            .ok_or_else(|| AppError::Encryption("Master key not loaded".to_string()))
    }

    fn read_entries(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            AppError::Storage(format!("Corrupt store {}: {}", self.path.display(), e))
        })
    }

    fn read_entries_or_reset(&self) -> Entries {
        self.read_entries().unwrap_or_else(|e| {
            warn!("Discarding unreadable token store: {}", e);
            Entries::new()
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut slot = self.security.lock();
        let security = self.load_security(&mut slot)?;
        self.read_entries()?
            .get(key)
            .map(|sealed| security.open(sealed))
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slot = self.security.lock();

        let loaded = self.load_security(&mut slot).map(|_| ());
        let mut entries = match loaded {
            Ok(()) => self.read_entries_or_reset(),
            Err(e) => {
                // Nothing sealed under the old key can be opened any more
                warn!("Master key unreadable, generating a new one: {}", e);
                *slot = Some(SecurityManager::regenerate(self.data_dir.clone())?);
                Entries::new()
            }
        };

        let security = self.load_security(&mut slot)?;
        entries.insert(key.to_string(), security.seal(value)?);
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.security.lock();

        match self.read_entries() {
            Ok(mut entries) => {
                if entries.remove(key).is_some() {
                    self.write_entries(&entries)?;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Clearing unreadable token store: {}", e);
                self.write_entries(&Entries::new())
            }
        }
    }
}
