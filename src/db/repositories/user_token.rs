use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::{now_timestamp, timestamp};
use crate::entities::user_tokens::{self, TokenPurpose};

pub struct UserTokenRepository {
    conn: DatabaseConnection,
}

impl UserTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issues a fresh one-shot token for `user_id`.
    pub async fn issue(
        &self,
        user_id: i32,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<user_tokens::Model> {
        let active = user_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(uuid::Uuid::new_v4().to_string()),
            purpose: Set(purpose),
            expires_at: Set(timestamp(Utc::now() + ttl)),
            used: Set(false),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to issue user token")
    }

    /// Returns the token when it exists, has the right purpose, is unused and
    /// has not expired.
    pub async fn find_valid(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<user_tokens::Model>> {
        user_tokens::Entity::find()
            .filter(user_tokens::Column::Token.eq(token))
            .filter(user_tokens::Column::Purpose.eq(purpose))
            .filter(user_tokens::Column::Used.eq(false))
            .filter(user_tokens::Column::ExpiresAt.gt(now_timestamp()))
            .one(&self.conn)
            .await
            .context("Failed to query user token")
    }

    /// Marks a token consumed. Returns false if it was already used.
    pub async fn consume(&self, id: i32) -> Result<bool> {
        let result = user_tokens::Entity::update_many()
            .col_expr(user_tokens::Column::Used, Expr::value(true))
            .filter(user_tokens::Column::Id.eq(id))
            .filter(user_tokens::Column::Used.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to consume user token")?;

        Ok(result.rows_affected == 1)
    }

    /// Marks every outstanding token of `user_id` consumed.
    pub async fn revoke_all(&self, user_id: i32) -> Result<u64> {
        let result = user_tokens::Entity::update_many()
            .col_expr(user_tokens::Column::Used, Expr::value(true))
            .filter(user_tokens::Column::UserId.eq(user_id))
            .filter(user_tokens::Column::Used.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to revoke user tokens")?;

        Ok(result.rows_affected)
    }
}
