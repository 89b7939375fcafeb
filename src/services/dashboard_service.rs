//! Dashboard Service
//!
//! Loads every dashboard panel at once. The loads run concurrently and fail
//! independently: one failing resource never hides the others.

use super::{BrokerTokenService, SymbolService, TaskService, TradeService};
use crate::api::types::{BrokerToken, Symbol, Task, Trade};
use crate::api::ApiClient;
use crate::error::{AppError, Result};
use crate::notify::{Notice, Notifier};
use tracing::{debug, info};

/// Outcome of each dashboard list load
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub trades: Result<Vec<Trade>>,
    pub symbols: Result<Vec<Symbol>>,
    pub broker_tokens: Result<Vec<BrokerToken>>,
    pub tasks: Result<Vec<Task>>,
}

impl DashboardSnapshot {
    /// Failed loads, labelled for display
    pub fn failures(&self) -> Vec<(&'static str, &AppError)> {
        [
            ("trades", self.trades.as_ref().err()),
            ("symbols", self.symbols.as_ref().err()),
            ("broker tokens", self.broker_tokens.as_ref().err()),
            ("tasks", self.tasks.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(label, err)| err.map(|e| (label, e)))
        .collect()
    }
}

/// Outcome of each dashboard count
#[derive(Debug)]
pub struct DashboardCounts {
    pub symbols: Result<u64>,
    pub trades: Result<u64>,
    pub broker_tokens: Result<u64>,
    pub tasks: Result<u64>,
}

pub struct DashboardService;

impl DashboardService {
    /// Fetch trades, symbols, broker tokens and tasks concurrently
    pub async fn load(client: &ApiClient) -> DashboardSnapshot {
        debug!("Loading dashboard data");
        let (trades, symbols, broker_tokens, tasks) = tokio::join!(
            TradeService::list(client),
            SymbolService::list(client),
            BrokerTokenService::list(client),
            TaskService::list(client),
        );

        DashboardSnapshot {
            trades,
            symbols,
            broker_tokens,
            tasks,
        }
    }

    /// Fetch the four record counts concurrently
    pub async fn load_counts(client: &ApiClient) -> DashboardCounts {
        let (symbols, trades, broker_tokens, tasks) = tokio::join!(
            SymbolService::count(client),
            TradeService::count(client),
            BrokerTokenService::count(client),
            TaskService::count(client),
        );

        DashboardCounts {
            symbols,
            trades,
            broker_tokens,
            tasks,
        }
    }

    /// Load the dashboard and report each failed panel through `notifier`
    pub async fn refresh(client: &ApiClient, notifier: &dyn Notifier) -> DashboardSnapshot {
        let snapshot = Self::load(client).await;

        let failures = snapshot.failures();
        for (label, err) in &failures {
            notifier.notify(&Notice::error(&format!("Error loading {}", label), err));
        }
        info!("Dashboard refreshed, {} of 4 loads failed", failures.len());

        snapshot
    }
}
