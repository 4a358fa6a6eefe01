//! `SeaORM` implementation of the `ApiKeyService` trait.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::db::Store;
use crate::domain::{Environment, Principal};
use crate::entities::{api_keys, users};
use crate::services::api_key_service::{ApiKeyError, ApiKeyInfo, ApiKeyService, CreatedApiKey};

const RAW_KEY_BYTES: usize = 48;
const PREFIX_LEN: usize = 8;

/// 48 random bytes, URL-safe base64 without padding (64 characters).
#[must_use]
pub fn generate_raw_key() -> String {
    let mut bytes = [0u8; RAW_KEY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[must_use]
pub fn hash_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct SeaOrmApiKeyService {
    store: Store,
}

impl SeaOrmApiKeyService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ApiKeyService for SeaOrmApiKeyService {
    async fn authenticate(
        &self,
        raw_key: &str,
    ) -> Result<(users::Model, api_keys::Model), ApiKeyError> {
        let raw_key = raw_key.trim();
        if raw_key.is_empty() {
            return Err(ApiKeyError::Unauthenticated);
        }

        let key = self
            .store
            .api_key_repo()
            .find_by_hash(&hash_key(raw_key))
            .await?
            .filter(|k| k.is_active)
            .ok_or(ApiKeyError::Unauthenticated)?;

        let user = self
            .store
            .user_repo()
            .get_by_id(key.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiKeyError::Unauthenticated)?;

        Ok((user, key))
    }

    async fn create_key(
        &self,
        principal: &Principal,
        name: &str,
        environment: Environment,
    ) -> Result<CreatedApiKey, ApiKeyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiKeyError::Validation("Key name is required".to_string()));
        }

        match environment {
            Environment::Production if !principal.is_admin() => {
                return Err(ApiKeyError::Forbidden);
            }
            Environment::Production | Environment::Sandbox => {}
        }

        let raw_key = generate_raw_key();
        let prefix = &raw_key[..PREFIX_LEN];

        let key = self
            .store
            .api_key_repo()
            .create(principal.user_id, name, prefix, &hash_key(&raw_key), environment)
            .await?;

        info!(
            event = "api_key_created",
            user_id = principal.user_id,
            environment = %environment,
            prefix = %prefix,
            "API key created"
        );

        Ok(CreatedApiKey {
            info: key.into(),
            raw_key,
        })
    }

    async fn list_keys(&self, principal: &Principal) -> Result<Vec<ApiKeyInfo>, ApiKeyError> {
        let keys = self.store.api_key_repo().list_owned(principal).await?;
        Ok(keys.into_iter().map(ApiKeyInfo::from).collect())
    }

    async fn revoke_key(&self, principal: &Principal, id: i32) -> Result<ApiKeyInfo, ApiKeyError> {
        let repo = self.store.api_key_repo();
        let key = repo
            .get_owned(principal, id)
            .await?
            .ok_or(ApiKeyError::NotFound)?;

        repo.deactivate(key.id).await?;
        info!(event = "api_key_revoked", user_id = principal.user_id, key_id = id, "API key revoked");

        Ok(ApiKeyInfo {
            is_active: false,
            ..key.into()
        })
    }

    async fn delete_key(&self, principal: &Principal, id: i32) -> Result<(), ApiKeyError> {
        let repo = self.store.api_key_repo();
        let key = repo
            .get_owned(principal, id)
            .await?
            .ok_or(ApiKeyError::NotFound)?;

        repo.delete(key.id).await?;
        Ok(())
    }

    async fn touch_last_used(&self, key_id: i32) -> Result<(), ApiKeyError> {
        self.store.api_key_repo().touch_last_used(key_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_keys_are_64_url_safe_chars() {
        let key = generate_raw_key();
        assert_eq!(key.len(), 64);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(key, generate_raw_key());
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
