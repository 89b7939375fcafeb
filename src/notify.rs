//! User-facing notices
//!
//! The client only classifies and propagates errors. Whatever surface sits
//! on top decides how a notice reaches the user through a [`Notifier`].

use crate::error::{AppError, ErrorResponse};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: String,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            code: "INFO".to_string(),
            message: message.into(),
        }
    }

    /// Error notice prefixed with what was being attempted
    pub fn error(context: &str, err: &AppError) -> Self {
        let response = ErrorResponse::from(err);
        Self {
            level: NoticeLevel::Error,
            code: response.code,
            message: format!("{}: {}", context, response.message),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Forwards notices to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(code = %notice.code, "{}", notice.message),
            NoticeLevel::Error => tracing::error!(code = %notice.code, "{}", notice.message),
        }
    }
}
