use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::Environment;
use crate::services::{ApiKeyInfo, CreatedApiKey};

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    /// `sandbox` (default) or `production`.
    #[serde(default)]
    pub environment: Option<String>,
}

/// GET /auth/api-keys
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<ApiKeyInfo>>>, ApiError> {
    let keys = state
        .shared
        .api_key_service
        .list_keys(&caller.principal)
        .await?;
    Ok(Json(ApiResponse::success(keys)))
}

/// POST /auth/api-keys
/// The raw key is only ever returned here.
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedApiKey>>), ApiError> {
    let environment = match payload.environment.as_deref().map(str::trim) {
        None | Some("") => Environment::Sandbox,
        Some(raw) => Environment::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("Unknown environment: {raw}")))?,
    };

    let created = state
        .shared
        .api_key_service
        .create_key(&caller.principal, &payload.name, environment)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// POST /auth/api-keys/{id}/revoke
pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ApiKeyInfo>>, ApiError> {
    let key = state
        .shared
        .api_key_service
        .revoke_key(&caller.principal, id)
        .await?;
    Ok(Json(ApiResponse::success(key)))
}

/// DELETE /auth/api-keys/{id}
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .api_key_service
        .delete_key(&caller.principal, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("API key deleted"))))
}
