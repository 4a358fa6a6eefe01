use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState, MessageResponse, promotion_status};
use crate::services::catalog_service::{TemplateInput, TemplateUpdate, TemplateView};
use crate::services::{Placeholder, Promoted, Rendered};

#[derive(Debug, Deserialize)]
pub struct PlaceholderDefaultsRequest {
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub data: Map<String, Value>,
}

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<TemplateView>>>, ApiError> {
    let templates = state
        .shared
        .catalog_service
        .list_templates(&caller.principal, caller.environment)
        .await?;
    Ok(Json(ApiResponse::success(templates)))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TemplateView>>, ApiError> {
    let template = state
        .shared
        .catalog_service
        .get_template(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(template)))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<TemplateInput>,
) -> Result<(StatusCode, Json<ApiResponse<TemplateView>>), ApiError> {
    let template = state
        .shared
        .catalog_service
        .create_template(&caller.principal, caller.environment, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(template))))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<TemplateUpdate>,
) -> Result<Json<ApiResponse<TemplateView>>, ApiError> {
    let template = state
        .shared
        .catalog_service
        .update_template(&caller.principal, caller.environment, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(template)))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .catalog_service
        .delete_template(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Template deleted"))))
}

/// POST /templates/{id}/placeholders
pub async fn set_placeholders(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<PlaceholderDefaultsRequest>,
) -> Result<Json<ApiResponse<TemplateView>>, ApiError> {
    let template = state
        .shared
        .catalog_service
        .set_placeholder_defaults(&caller.principal, caller.environment, id, payload.placeholders)
        .await?;
    Ok(Json(ApiResponse::success(template)))
}

/// POST /templates/{id}/preview
pub async fn preview_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<ApiResponse<Rendered>>, ApiError> {
    let rendered = state
        .shared
        .catalog_service
        .preview_template(&caller.principal, caller.environment, id, payload.data)
        .await?;
    Ok(Json(ApiResponse::success(rendered)))
}

/// POST /templates/{id}/promote
pub async fn promote_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Promoted<TemplateView>>>), ApiError> {
    let promoted = state
        .shared
        .catalog_service
        .promote_template(&caller.principal, caller.environment, id)
        .await?;
    Ok((
        promotion_status(promoted.outcome),
        Json(ApiResponse::success(promoted)),
    ))
}
