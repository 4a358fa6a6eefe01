use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::now_timestamp;
use crate::domain::Role;
use crate::entities::{organizations, users};

/// Fields of a user row supplied at creation.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub organization_id: Option<i32>,
    pub is_active: bool,
}

impl NewUser {
    fn into_active_model(self, now: &str) -> users::ActiveModel {
        users::ActiveModel {
            username: Set(self.username),
            email: Set(self.email),
            password_hash: Set(self.password_hash),
            first_name: Set(self.first_name),
            last_name: Set(self.last_name),
            phone: Set(self.phone),
            role: Set(self.role),
            organization_id: Set(self.organization_id),
            is_active: Set(self.is_active),
            created_at: Set(now.to_string()),
            updated_at: Set(now.to_string()),
            ..Default::default()
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// Looks a user up by username or email, whichever matches.
    pub async fn get_by_login(&self, identifier: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(identifier))
                    .add(users::Column::Email.eq(identifier.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by login")
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let existing = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to check username and email availability")?;

        Ok(existing.is_some())
    }

    pub async fn create(&self, user: NewUser) -> Result<users::Model> {
        let now = now_timestamp();
        user.into_active_model(&now)
            .insert(&self.conn)
            .await
            .context("Failed to create user")
    }

    /// Creates an organization and its first member in one transaction.
    pub async fn create_with_organization(
        &self,
        organization_name: &str,
        user: NewUser,
    ) -> Result<(organizations::Model, users::Model)> {
        let now = now_timestamp();
        let txn = self.conn.begin().await?;

        let organization = organizations::ActiveModel {
            name: Set(organization_name.to_string()),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to create organization")?;

        let mut active = user.into_active_model(&now);
        active.organization_id = Set(Some(organization.id));
        let user = active
            .insert(&txn)
            .await
            .context("Failed to create user")?;

        txn.commit().await?;
        Ok((organization, user))
    }

    /// Members of an organization, optionally leaving one user out.
    pub async fn list_in_organization(
        &self,
        organization_id: i32,
        exclude_user_id: Option<i32>,
    ) -> Result<Vec<users::Model>> {
        let mut query = users::Entity::find()
            .filter(users::Column::OrganizationId.eq(organization_id))
            .order_by_asc(users::Column::Username);

        if let Some(id) = exclude_user_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        query
            .all(&self.conn)
            .await
            .context("Failed to list organization members")
    }

    pub async fn update(&self, active: users::ActiveModel) -> Result<users::Model> {
        let mut active = active;
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await.context("Failed to update user")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected > 0)
    }

    /// Verify password for a user, returning the user when it matches.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<users::Model>> {
        let Some(user) = self.get_by_login(identifier).await? else {
            return Ok(None);
        };

        let Some(password_hash) = user.password_hash.clone() else {
            return Ok(None);
        };
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password_hash(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        Ok(is_valid.then_some(user))
    }

    /// Stores a new password hash. With `activate` the account is enabled too,
    /// which only accepting an invitation may do.
    pub async fn set_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
        activate: bool,
    ) -> Result<users::Model> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        if activate {
            active.is_active = Set(true);
        }
        self.update(active).await
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

fn verify_password_hash(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    // Parameters are read back from the PHC string, so any cost settings verify.
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse", Some(&cheap_config())).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password_hash("correct horse", &hash).unwrap());
        assert!(!verify_password_hash("wrong horse", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password_hash("anything", "not-a-phc-string").is_err());
    }
}
