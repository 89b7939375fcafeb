//! Services Layer
//!
//! One service per remote resource, all sharing the session of the
//! [`ApiClient`](crate::api::ApiClient) they are handed.
//!
//! # Services
//!
//! - `UserService` - Current user, API health
//! - `SymbolService` - Symbol list and lookup
//! - `TradeService` - Trade history
//! - `BrokerTokenService` - Broker access tokens
//! - `TaskService` - Background tasks and their logs
//! - `FamilyMemberService` - Family member accounts
//! - `DashboardService` - Concurrent dashboard loads

pub mod user_service;
pub mod symbol_service;
pub mod trade_service;
pub mod broker_token_service;
pub mod task_service;
pub mod family_service;
pub mod dashboard_service;

pub use user_service::UserService;
pub use symbol_service::SymbolService;
pub use trade_service::TradeService;
pub use broker_token_service::BrokerTokenService;
pub use task_service::TaskService;
pub use family_service::FamilyMemberService;
pub use dashboard_service::{DashboardCounts, DashboardService, DashboardSnapshot};

use crate::error::{AppError, Result};

/// Reject blank required input before anything is sent
pub(crate) fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
