use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::domain::scope::{owned_by, visible_to};
use crate::domain::{Environment, Principal};
use crate::entities::email_templates;

pub struct TemplateRepository {
    conn: DatabaseConnection,
}

impl TemplateRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_visible(
        &self,
        principal: &Principal,
        environment: Environment,
    ) -> Result<Vec<email_templates::Model>> {
        email_templates::Entity::find()
            .filter(visible_to::<email_templates::Entity>(principal, Some(environment)))
            .order_by_desc(email_templates::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list templates")
    }

    pub async fn get_visible(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<email_templates::Model>> {
        email_templates::Entity::find_by_id(id)
            .filter(visible_to::<email_templates::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query template")
    }

    pub async fn get_owned(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<email_templates::Model>> {
        email_templates::Entity::find_by_id(id)
            .filter(owned_by::<email_templates::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query template")
    }

    /// Unscoped lookup, for callers that already resolved the owner.
    pub async fn get(&self, id: i32) -> Result<Option<email_templates::Model>> {
        email_templates::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query template by ID")
    }

    pub async fn find_by_name(
        &self,
        user_id: i32,
        environment: Environment,
        name: &str,
    ) -> Result<Option<email_templates::Model>> {
        email_templates::Entity::find()
            .filter(email_templates::Column::UserId.eq(user_id))
            .filter(email_templates::Column::Environment.eq(environment))
            .filter(email_templates::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query template by name")
    }

    pub async fn insert(
        &self,
        active: email_templates::ActiveModel,
    ) -> Result<email_templates::Model> {
        let now = now_timestamp();
        let mut active = active;
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);
        active
            .insert(&self.conn)
            .await
            .context("Failed to insert template")
    }

    pub async fn update(
        &self,
        active: email_templates::ActiveModel,
    ) -> Result<email_templates::Model> {
        let mut active = active;
        active.updated_at = Set(now_timestamp());
        active
            .update(&self.conn)
            .await
            .context("Failed to update template")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = email_templates::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete template")?;
        Ok(result.rows_affected > 0)
    }
}
