//! Symbol Service
//!
//! Read-only access to the symbol master.

use crate::api::types::{RecordId, Symbol};
use crate::api::{ApiClient, Resource};
use crate::error::Result;
use tracing::debug;

pub struct SymbolService;

impl SymbolService {
    /// Get all symbols
    pub async fn list(client: &ApiClient) -> Result<Vec<Symbol>> {
        let symbols: Vec<Symbol> = client
            .get_json(Resource::Symbols, &Resource::Symbols.route())
            .await?;
        debug!("Loaded {} symbols", symbols.len());
        Ok(symbols)
    }

    /// Get a symbol by id
    pub async fn get(client: &ApiClient, id: &RecordId) -> Result<Symbol> {
        client
            .get_json(Resource::Symbols, &Resource::Symbols.item(id))
            .await
    }

    pub async fn count(client: &ApiClient) -> Result<u64> {
        client.count(Resource::Symbols).await
    }
}
