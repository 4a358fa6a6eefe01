use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::now_timestamp;
use crate::entities::organizations;

pub struct OrganizationRepository {
    conn: DatabaseConnection,
}

impl OrganizationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<organizations::Model>> {
        organizations::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query organization by ID")
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<organizations::Model>> {
        organizations::Entity::find()
            .filter(organizations::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query organization by name")
    }

    pub async fn create(&self, name: &str) -> Result<organizations::Model> {
        let active = organizations::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to create organization")
    }
}
