//! Broker Token Service
//!
//! Manages the broker access tokens stored on the server. Token values are
//! only ever logged masked.

use super::require;
use crate::api::types::{BrokerToken, BrokerTokenUpdate, NewBrokerToken, RecordId};
use crate::api::{ApiClient, Resource};
use crate::display::mask_token;
use crate::error::Result;
use serde_json::Value;
use tracing::info;

pub struct BrokerTokenService;

impl BrokerTokenService {
    pub async fn list(client: &ApiClient) -> Result<Vec<BrokerToken>> {
        client
            .get_json(Resource::BrokerTokens, &Resource::BrokerTokens.route())
            .await
    }

    pub async fn count(client: &ApiClient) -> Result<u64> {
        client.count(Resource::BrokerTokens).await
    }

    /// Add a broker token
    pub async fn create(client: &ApiClient, token: &NewBrokerToken) -> Result<BrokerToken> {
        require(&token.broker, "Broker")?;
        require(&token.token, "Token")?;

        info!(
            "Adding {} token {}",
            token.broker,
            mask_token(&token.token)
        );
        client
            .post_json(Resource::BrokerTokens, &Resource::BrokerTokens.route(), token)
            .await
    }

    /// Replace the value of an existing token.
    ///
    /// The server may answer with the updated record or with no body, so the
    /// raw JSON is returned.
    pub async fn update(client: &ApiClient, id: &RecordId, token: &str) -> Result<Value> {
        require(token, "Token")?;

        info!("Updating broker token {}", id);
        let body = BrokerTokenUpdate {
            token: token.to_string(),
        };
        client
            .put_json(
                Resource::BrokerTokens,
                &Resource::BrokerTokens.item(id),
                &body,
            )
            .await
    }

    pub async fn delete(client: &ApiClient, id: &RecordId) -> Result<()> {
        info!("Deleting broker token {}", id);
        client
            .delete(Resource::BrokerTokens, &Resource::BrokerTokens.item(id))
            .await
    }
}
