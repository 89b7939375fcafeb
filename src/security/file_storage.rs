//! Master key file
//!
//! The key that seals persisted tokens lives next to them in `secrets.dat`,
//! XOR-obfuscated and base64 encoded. This keeps the token file unreadable on
//! its own without prompting for an OS keychain password.

use super::encryption::{EncryptionManager, KEY_SIZE};
use crate::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::PathBuf;

const SECRETS_FILE: &str = "secrets.dat";
const OBFUSCATION_KEY: &[u8] = b"TradeMicro-Client-v1-KeyMaterial";

pub struct FileStorage {
    config_dir: PathBuf,
}

impl FileStorage {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.config_dir.join(SECRETS_FILE)
    }

    /// Read the master key, generating and saving one on first use
    pub fn get_or_create_master_key(&self) -> Result<Vec<u8>> {
        let path = self.secrets_path();

        if path.exists() {
            let data = fs::read_to_string(&path)
                .map_err(|e| AppError::Config(format!("Failed to read secrets: {}", e)))?;
            return Self::decode_key(data.trim());
        }

        self.create_master_key()
    }

    /// Generate a master key and save it, replacing any existing one
    pub fn create_master_key(&self) -> Result<Vec<u8>> {
        let path = self.secrets_path();
        let key = EncryptionManager::generate_key();

        fs::create_dir_all(&self.config_dir)
            .map_err(|e| AppError::Config(format!("Failed to create config dir: {}", e)))?;
        fs::write(&path, Self::encode_key(&key))
            .map_err(|e| AppError::Config(format!("Failed to write secrets: {}", e)))?;
        restrict_permissions(&path)?;

        tracing::info!("Generated new master key at {}", path.display());
        Ok(key)
    }

    fn encode_key(key: &[u8]) -> String {
        STANDARD.encode(xor(key))
    }

    fn decode_key(data: &str) -> Result<Vec<u8>> {
        let obfuscated = STANDARD
            .decode(data)
            .map_err(|e| AppError::Config(format!("Failed to decode master key: {}", e)))?;

        let key = xor(&obfuscated);
        if key.len() != KEY_SIZE {
            return Err(AppError::Config("Invalid secrets format".to_string()));
        }
        Ok(key)
    }
}

fn xor(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(a, b)| a ^ b)
        .collect()
}

#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
