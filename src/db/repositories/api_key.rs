use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_timestamp;
use crate::domain::scope::owned_by;
use crate::domain::{Environment, Principal};
use crate::entities::api_keys;

pub struct ApiKeyRepository {
    conn: DatabaseConnection,
}

impl ApiKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        name: &str,
        prefix: &str,
        key_hash: &str,
        environment: Environment,
    ) -> Result<api_keys::Model> {
        let active = api_keys::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.to_string()),
            prefix: Set(prefix.to_string()),
            key_hash: Set(key_hash.to_string()),
            environment: Set(environment),
            is_active: Set(true),
            last_used_at: Set(None),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to create API key")
    }

    /// All keys of the principal, across both environments.
    pub async fn list_owned(&self, principal: &Principal) -> Result<Vec<api_keys::Model>> {
        api_keys::Entity::find()
            .filter(owned_by::<api_keys::Entity>(principal, None))
            .order_by_desc(api_keys::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list API keys")
    }

    pub async fn get_owned(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<Option<api_keys::Model>> {
        api_keys::Entity::find_by_id(id)
            .filter(owned_by::<api_keys::Entity>(principal, None))
            .one(&self.conn)
            .await
            .context("Failed to query API key")
    }

    pub async fn find_by_hash(&self, key_hash: &str) -> Result<Option<api_keys::Model>> {
        api_keys::Entity::find()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .one(&self.conn)
            .await
            .context("Failed to query API key by hash")
    }

    pub async fn touch_last_used(&self, id: i32) -> Result<()> {
        api_keys::Entity::update_many()
            .col_expr(api_keys::Column::LastUsedAt, Expr::value(now_timestamp()))
            .filter(api_keys::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record API key usage")?;
        Ok(())
    }

    pub async fn deactivate(&self, id: i32) -> Result<()> {
        api_keys::Entity::update_many()
            .col_expr(api_keys::Column::IsActive, Expr::value(false))
            .filter(api_keys::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to revoke API key")?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = api_keys::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete API key")?;
        Ok(result.rows_affected > 0)
    }
}
