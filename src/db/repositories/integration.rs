use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::domain::scope::{owned_by, visible_to};
use crate::domain::{Environment, Principal};
use crate::entities::integrations;

pub struct IntegrationRepository {
    conn: DatabaseConnection,
}

impl IntegrationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_visible(
        &self,
        principal: &Principal,
        environment: Environment,
    ) -> Result<Vec<integrations::Model>> {
        integrations::Entity::find()
            .filter(visible_to::<integrations::Entity>(principal, Some(environment)))
            .order_by_desc(integrations::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list integrations")
    }

    pub async fn get_visible(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<integrations::Model>> {
        integrations::Entity::find_by_id(id)
            .filter(visible_to::<integrations::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query integration")
    }

    pub async fn get_owned(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<integrations::Model>> {
        integrations::Entity::find_by_id(id)
            .filter(owned_by::<integrations::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query integration")
    }

    /// Unscoped lookup, for callers that already resolved the owner.
    pub async fn get(&self, id: i32) -> Result<Option<integrations::Model>> {
        integrations::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query integration by ID")
    }

    pub async fn find_by_name(
        &self,
        user_id: i32,
        environment: Environment,
        name: &str,
    ) -> Result<Option<integrations::Model>> {
        integrations::Entity::find()
            .filter(integrations::Column::UserId.eq(user_id))
            .filter(integrations::Column::Environment.eq(environment))
            .filter(integrations::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query integration by name")
    }

    pub async fn insert(
        &self,
        active: integrations::ActiveModel,
    ) -> Result<integrations::Model> {
        let now = now_timestamp();
        let mut active = active;
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);
        active
            .insert(&self.conn)
            .await
            .context("Failed to insert integration")
    }

    pub async fn update(
        &self,
        active: integrations::ActiveModel,
    ) -> Result<integrations::Model> {
        let mut active = active;
        active.updated_at = Set(now_timestamp());
        active
            .update(&self.conn)
            .await
            .context("Failed to update integration")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = integrations::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete integration")?;
        Ok(result.rows_affected > 0)
    }
}
