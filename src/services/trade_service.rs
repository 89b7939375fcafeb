//! Trade Service

use crate::api::types::{RecordId, Trade};
use crate::api::{ApiClient, Resource};
use crate::error::Result;

pub struct TradeService;

impl TradeService {
    /// Get trade history
    pub async fn list(client: &ApiClient) -> Result<Vec<Trade>> {
        client
            .get_json(Resource::Trades, &Resource::Trades.route())
            .await
    }

    pub async fn get(client: &ApiClient, id: &RecordId) -> Result<Trade> {
        client
            .get_json(Resource::Trades, &Resource::Trades.item(id))
            .await
    }

    pub async fn count(client: &ApiClient) -> Result<u64> {
        client.count(Resource::Trades).await
    }
}
