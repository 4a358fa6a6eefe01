use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::domain::scope::{owned_by, visible_to};
use crate::domain::{Environment, Principal};
use crate::entities::events;

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_visible(
        &self,
        principal: &Principal,
        environment: Environment,
    ) -> Result<Vec<events::Model>> {
        events::Entity::find()
            .filter(visible_to::<events::Entity>(principal, Some(environment)))
            .order_by_desc(events::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list events")
    }

    pub async fn get_visible(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<events::Model>> {
        events::Entity::find_by_id(id)
            .filter(visible_to::<events::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query event")
    }

    pub async fn get_owned(
        &self,
        principal: &Principal,
        environment: Environment,
        id: i32,
    ) -> Result<Option<events::Model>> {
        events::Entity::find_by_id(id)
            .filter(owned_by::<events::Entity>(principal, Some(environment)))
            .one(&self.conn)
            .await
            .context("Failed to query event")
    }

    /// Unscoped lookup, for callers that already resolved the owner.
    pub async fn get(&self, id: i32) -> Result<Option<events::Model>> {
        events::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query event by ID")
    }

    /// Exact (owner, slug, environment) match restricted to active events.
    pub async fn find_active_by_slug(
        &self,
        user_id: i32,
        environment: Environment,
        slug: &str,
    ) -> Result<Option<events::Model>> {
        events::Entity::find()
            .filter(events::Column::UserId.eq(user_id))
            .filter(events::Column::Environment.eq(environment))
            .filter(events::Column::Slug.eq(slug))
            .filter(events::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query active event by slug")
    }

    pub async fn insert(
        &self,
        active: events::ActiveModel,
    ) -> Result<events::Model> {
        let now = now_timestamp();
        let mut active = active;
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);
        active
            .insert(&self.conn)
            .await
            .context("Failed to insert event")
    }

    pub async fn update(
        &self,
        active: events::ActiveModel,
    ) -> Result<events::Model> {
        let mut active = active;
        active.updated_at = Set(now_timestamp());
        active
            .update(&self.conn)
            .await
            .context("Failed to update event")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = events::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete event")?;
        Ok(result.rows_affected > 0)
    }
}
