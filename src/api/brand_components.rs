use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::BrandComponentView;
use crate::services::brand_service::{BrandComponentInput, BrandComponentUpdate};

pub async fn list_components(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<BrandComponentView>>>, ApiError> {
    let components = state.shared.brand_components.list(&caller.principal).await?;
    Ok(Json(ApiResponse::success(components)))
}

pub async fn get_component(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<BrandComponentView>>, ApiError> {
    let component = state
        .shared
        .brand_components
        .get(&caller.principal, id)
        .await?;
    Ok(Json(ApiResponse::success(component)))
}

pub async fn create_component(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<BrandComponentInput>,
) -> Result<(StatusCode, Json<ApiResponse<BrandComponentView>>), ApiError> {
    let component = state
        .shared
        .brand_components
        .create(&caller.principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(component))))
}

pub async fn update_component(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<BrandComponentUpdate>,
) -> Result<Json<ApiResponse<BrandComponentView>>, ApiError> {
    let component = state
        .shared
        .brand_components
        .update(&caller.principal, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(component)))
}

pub async fn delete_component(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .brand_components
        .delete(&caller.principal, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Brand component deleted",
    ))))
}
