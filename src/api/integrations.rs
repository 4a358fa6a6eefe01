use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState, MessageResponse, promotion_status};
use crate::services::Promoted;
use crate::services::catalog_service::{IntegrationInput, IntegrationUpdate, IntegrationView};

pub async fn list_integrations(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<IntegrationView>>>, ApiError> {
    let integrations = state
        .shared
        .catalog_service
        .list_integrations(&caller.principal, caller.environment)
        .await?;
    Ok(Json(ApiResponse::success(integrations)))
}

pub async fn get_integration(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<IntegrationView>>, ApiError> {
    let integration = state
        .shared
        .catalog_service
        .get_integration(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(integration)))
}

pub async fn create_integration(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<IntegrationInput>,
) -> Result<(StatusCode, Json<ApiResponse<IntegrationView>>), ApiError> {
    let integration = state
        .shared
        .catalog_service
        .create_integration(&caller.principal, caller.environment, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(integration))))
}

pub async fn update_integration(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<IntegrationUpdate>,
) -> Result<Json<ApiResponse<IntegrationView>>, ApiError> {
    let integration = state
        .shared
        .catalog_service
        .update_integration(&caller.principal, caller.environment, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(integration)))
}

pub async fn delete_integration(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .catalog_service
        .delete_integration(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Integration deleted",
    ))))
}

/// POST /integrations/{id}/promote
pub async fn promote_integration(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Promoted<IntegrationView>>>), ApiError> {
    let promoted = state
        .shared
        .catalog_service
        .promote_integration(&caller.principal, caller.environment, id)
        .await?;
    Ok((
        promotion_status(promoted.outcome),
        Json(ApiResponse::success(promoted)),
    ))
}
