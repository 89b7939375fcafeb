//! Client error types

use crate::api::Resource;
use serde::Serialize;
use thiserror::Error;

/// Client-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Request for {resource} failed with status {status}")]
    RequestFailed { resource: Resource, status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Login failed with status {status}")]
    Auth { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the caller has to go back to login
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::NotAuthenticated | AppError::SessionExpired)
    }

    /// Stable error code for notices and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::RequestFailed { .. } => "REQUEST_FAILED",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Auth { .. } => "AUTH_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Keychain(_) => "KEYCHAIN_ERROR",
            AppError::Encryption(_) => "ENCRYPTION_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }
}

/// Serializable error projection for notices and CLI output
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
