//! Domain service for environment-bound API keys.
//!
//! A key belongs to one user and one environment for its whole life. Only
//! the SHA-256 hash and a short display prefix are persisted; the raw key is
//! returned once, at creation.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Environment, Principal};
use crate::entities::{api_keys, users};

#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error("Invalid or inactive API key")]
    Unauthenticated,

    #[error("Only admins can create production API keys")]
    Forbidden,

    #[error("API key not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ApiKeyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ApiKeyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public view of a key. Never carries the raw value or the hash.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyInfo {
    pub id: i32,
    pub name: String,
    pub prefix: String,
    pub environment: Environment,
    pub is_active: bool,
    pub last_used_at: Option<String>,
    pub created_at: String,
}

impl From<api_keys::Model> for ApiKeyInfo {
    fn from(key: api_keys::Model) -> Self {
        Self {
            id: key.id,
            name: key.name,
            prefix: key.prefix,
            environment: key.environment,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

/// A freshly minted key together with its raw value.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    #[serde(flatten)]
    pub info: ApiKeyInfo,
    pub raw_key: String,
}

#[async_trait::async_trait]
pub trait ApiKeyService: Send + Sync {
    /// Resolves a presented key to its owner.
    ///
    /// # Errors
    ///
    /// Returns [`ApiKeyError::Unauthenticated`] if the key is unknown,
    /// revoked, or its owner is inactive.
    async fn authenticate(&self, raw_key: &str)
    -> Result<(users::Model, api_keys::Model), ApiKeyError>;

    /// Mints a key bound to `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiKeyError::Forbidden`] for a production key requested by
    /// a non-admin.
    async fn create_key(
        &self,
        principal: &Principal,
        name: &str,
        environment: Environment,
    ) -> Result<CreatedApiKey, ApiKeyError>;

    async fn list_keys(&self, principal: &Principal) -> Result<Vec<ApiKeyInfo>, ApiKeyError>;

    async fn revoke_key(&self, principal: &Principal, id: i32) -> Result<ApiKeyInfo, ApiKeyError>;

    async fn delete_key(&self, principal: &Principal, id: i32) -> Result<(), ApiKeyError>;

    /// Records that a key was used. Callers treat failures as non-fatal.
    async fn touch_last_used(&self, key_id: i32) -> Result<(), ApiKeyError>;
}
