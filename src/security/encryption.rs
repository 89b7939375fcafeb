//! AES-256-GCM sealing of stored values

use crate::error::{AppError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

const NONCE_SIZE: usize = 12;
pub(crate) const KEY_SIZE: usize = 32;

/// Ciphertext and nonce, both base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub ciphertext: String,
    pub nonce: String,
}

pub struct EncryptionManager {
    cipher: Aes256Gcm,
}

impl EncryptionManager {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid key size: expected {}, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| AppError::Encryption(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Fresh random key
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt under a fresh random nonce
    pub fn seal(&self, plaintext: &str) -> Result<SealedValue> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        Ok(SealedValue {
            ciphertext: STANDARD.encode(ciphertext),
            nonce: STANDARD.encode(nonce_bytes),
        })
    }

    pub fn open(&self, sealed: &SealedValue) -> Result<String> {
        let ciphertext = STANDARD
            .decode(&sealed.ciphertext)
            .map_err(|e| AppError::Encryption(format!("Invalid ciphertext base64: {}", e)))?;

        let nonce_bytes = STANDARD
            .decode(&sealed.nonce)
            .map_err(|e| AppError::Encryption(format!("Invalid nonce base64: {}", e)))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Encryption(format!("Invalid UTF-8 in plaintext: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let manager = EncryptionManager::new(&EncryptionManager::generate_key()).unwrap();

        let sealed = manager.seal("tok-session-abc").unwrap();
        assert_ne!(sealed.ciphertext, "tok-session-abc");
        assert_eq!(manager.open(&sealed).unwrap(), "tok-session-abc");
    }

    #[test]
    fn test_nonces_differ() {
        let manager = EncryptionManager::new(&EncryptionManager::generate_key()).unwrap();

        let first = manager.seal("same").unwrap();
        let second = manager.seal("same").unwrap();
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealer = EncryptionManager::new(&EncryptionManager::generate_key()).unwrap();
        let other = EncryptionManager::new(&EncryptionManager::generate_key()).unwrap();

        let sealed = sealer.seal("secret").unwrap();
        assert!(matches!(other.open(&sealed), Err(AppError::Encryption(_))));
    }

    #[test]
    fn test_rejects_short_key() {
        assert!(EncryptionManager::new(&[0u8; 16]).is_err());
    }
}
