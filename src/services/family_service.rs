//! Family Member Service

use super::require;
use crate::api::types::{FamilyMember, NewFamilyMember, RecordId};
use crate::api::{ApiClient, Resource};
use crate::error::Result;
use serde_json::Value;
use tracing::info;

pub struct FamilyMemberService;

impl FamilyMemberService {
    pub async fn list(client: &ApiClient) -> Result<Vec<FamilyMember>> {
        client
            .get_json(Resource::FamilyMembers, &Resource::FamilyMembers.route())
            .await
    }

    /// Add a family member with their broker credentials
    pub async fn create(client: &ApiClient, member: &NewFamilyMember) -> Result<FamilyMember> {
        require(&member.name, "Name")?;

        info!("Adding family member {}", member.name);
        client
            .post_json(Resource::FamilyMembers, &Resource::FamilyMembers.route(), member)
            .await
    }

    /// Apply a partial update; returns whatever the server answers with
    pub async fn update(client: &ApiClient, id: &RecordId, changes: &Value) -> Result<Value> {
        info!("Updating family member {}", id);
        client
            .put_json(
                Resource::FamilyMembers,
                &Resource::FamilyMembers.item(id),
                changes,
            )
            .await
    }

    pub async fn delete(client: &ApiClient, id: &RecordId) -> Result<()> {
        info!("Deleting family member {}", id);
        client
            .delete(Resource::FamilyMembers, &Resource::FamilyMembers.item(id))
            .await
    }
}
