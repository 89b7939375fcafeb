//! Client configuration
//!
//! Resolution order: TOML file, then `TRADEMICRO_*` environment variables,
//! then whatever the caller (the CLI) sets explicitly.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

pub const ENV_API_URL: &str = "TRADEMICRO_API_URL";
pub const ENV_DATA_DIR: &str = "TRADEMICRO_DATA_DIR";
pub const ENV_TOKEN_STORE: &str = "TRADEMICRO_TOKEN_STORE";

/// Where the session token is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Encrypted file in the data directory
    #[default]
    File,
    /// OS keychain
    Keychain,
    /// Not persisted across runs
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "keychain" => Ok(StoreBackend::Keychain),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "Unknown token store '{}', expected file, keychain or memory",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreBackend::File => "file",
            StoreBackend::Keychain => "keychain",
            StoreBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://trade.example.com/api`
    pub base_url: String,
    pub store: StoreBackend,
    pub data_dir: PathBuf,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    pub timeout_secs: Option<u64>,
    /// Ignore proxy environment variables
    pub no_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            store: StoreBackend::default(),
            data_dir: default_data_dir(),
            timeout_secs: None,
            no_proxy: false,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| AppError::Config(format!("Invalid config: {}", e)))
    }

    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                tracing::debug!("Loaded config from {}", path.display());
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env()
    }

    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TRADEMICRO_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(store) = lookup(ENV_TOKEN_STORE).filter(|v| !v.trim().is_empty()) {
            self.store = store.parse()?;
        }

        Ok(self)
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".trademicro")
}
