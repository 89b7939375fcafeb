//! Persisted key-value storage for the session token

mod file_store;
mod keychain;

use crate::config::{ClientConfig, StoreBackend};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub use file_store::FileStore;
pub use keychain::KeychainStore;

/// Key the session token is persisted under
pub const TOKEN_KEY: &str = "token";

/// Local key-value store. Removing a missing key is not an error.
pub trait TokenStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Open the store selected by `config`
pub fn open(config: &ClientConfig) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.store {
        StoreBackend::File => Arc::new(FileStore::new(config.data_dir.clone())),
        StoreBackend::Keychain => Arc::new(KeychainStore::new()),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::debug!("Using {} token store", store.name());
    Ok(store)
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
