use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::db::now_timestamp;
use crate::domain::Principal;
use crate::domain::scope::{owned_by, visible_to};
use crate::entities::brand_components;

pub struct BrandComponentRepository {
    conn: DatabaseConnection,
}

impl BrandComponentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Components of every member of the principal's organization.
    pub async fn list_visible(
        &self,
        principal: &Principal,
    ) -> Result<Vec<brand_components::Model>> {
        brand_components::Entity::find()
            .filter(visible_to::<brand_components::Entity>(principal, None))
            .order_by_asc(brand_components::Column::Category)
            .order_by_asc(brand_components::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list brand components")
    }

    pub async fn get_visible(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<Option<brand_components::Model>> {
        brand_components::Entity::find_by_id(id)
            .filter(visible_to::<brand_components::Entity>(principal, None))
            .one(&self.conn)
            .await
            .context("Failed to query brand component")
    }

    pub async fn get_owned(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<Option<brand_components::Model>> {
        brand_components::Entity::find_by_id(id)
            .filter(owned_by::<brand_components::Entity>(principal, None))
            .one(&self.conn)
            .await
            .context("Failed to query brand component")
    }

    pub async fn insert(
        &self,
        active: brand_components::ActiveModel,
    ) -> Result<brand_components::Model> {
        let now = now_timestamp();
        let mut active = active;
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);
        active
            .insert(&self.conn)
            .await
            .context("Failed to insert brand component")
    }

    pub async fn update(
        &self,
        active: brand_components::ActiveModel,
    ) -> Result<brand_components::Model> {
        let mut active = active;
        active.updated_at = Set(now_timestamp());
        active
            .update(&self.conn)
            .await
            .context("Failed to update brand component")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = brand_components::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete brand component")?;
        Ok(result.rows_affected > 0)
    }
}
