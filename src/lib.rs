//! TradeMicro Client - Authenticated API client
//!
//! Session handling, token persistence and resource access for the
//! TradeMicro trading API.

pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod notify;
pub mod security;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, ApiPath, RequestOptions, Resource};
pub use config::{ClientConfig, StoreBackend};
pub use error::{AppError, ErrorResponse, Result};
pub use notify::{LogNotifier, Notice, NoticeLevel, Notifier};
pub use state::{Session, SessionState, SessionStatus};
pub use store::TokenStore;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "trademicro_client=info,trademicro=info";

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is a no-op.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
