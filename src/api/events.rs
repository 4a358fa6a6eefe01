use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState, MessageResponse, promotion_status};
use crate::services::catalog_service::{EventInput, EventUpdate, EventView};
use crate::services::trigger::{TestSendRequest, TriggerRequest};
use crate::services::{Promoted, TriggerAccepted};

/// POST /events/trigger
/// External entry point. Authenticated by API key only; the key decides the
/// environment.
pub async fn trigger_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    if payload.event.trim().is_empty() {
        return Err(ApiError::validation("event is required"));
    }

    let accepted = state
        .shared
        .trigger_service
        .trigger(&caller.principal, caller.environment, payload)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(accepted))))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<EventView>>>, ApiError> {
    let events = state
        .shared
        .catalog_service
        .list_events(&caller.principal, caller.environment)
        .await?;
    Ok(Json(ApiResponse::success(events)))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventView>>, ApiError> {
    let event = state
        .shared
        .catalog_service
        .get_event(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<EventInput>,
) -> Result<(StatusCode, Json<ApiResponse<EventView>>), ApiError> {
    let event = state
        .shared
        .catalog_service
        .create_event(&caller.principal, caller.environment, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<EventUpdate>,
) -> Result<Json<ApiResponse<EventView>>, ApiError> {
    let event = state
        .shared
        .catalog_service
        .update_event(&caller.principal, caller.environment, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .catalog_service
        .delete_event(&caller.principal, caller.environment, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Event deleted"))))
}

/// POST /events/definitions/{id}/promote
pub async fn promote_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<Promoted<EventView>>>), ApiError> {
    let promoted = state
        .shared
        .catalog_service
        .promote_event(&caller.principal, caller.environment, id)
        .await?;
    Ok((
        promotion_status(promoted.outcome),
        Json(ApiResponse::success(promoted)),
    ))
}

/// POST /events/definitions/{id}/test
pub async fn test_event(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<TestSendRequest>,
) -> Result<Json<ApiResponse<TriggerAccepted>>, ApiError> {
    let accepted = state
        .shared
        .trigger_service
        .test_send(&caller.principal, caller.environment, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(accepted)))
}
