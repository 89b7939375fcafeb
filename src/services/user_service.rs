//! User Service
//!
//! Current user lookup and the public health check.

use crate::api::types::{HealthStatus, UserInfo};
use crate::api::{ApiClient, Resource};
use crate::error::Result;
use tracing::debug;

pub struct UserService;

impl UserService {
    /// Get the user owning the current session
    pub async fn current_user(client: &ApiClient) -> Result<UserInfo> {
        let user: UserInfo = client.get_json(Resource::User, &Resource::User.route()).await?;
        debug!("Current user: {}", user.username);
        Ok(user)
    }

    /// Check API health. Works without a session.
    pub async fn health(client: &ApiClient) -> Result<HealthStatus> {
        client
            .get_public_json(Resource::Health, &Resource::Health.route())
            .await
    }
}
