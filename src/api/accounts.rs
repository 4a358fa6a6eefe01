use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{Caller, SESSION_USER_KEY};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::UserView;
use crate::services::account_service::{
    ForgotPasswordRequest, InviteRequest, Invited, PasswordTokenRequest, RegisterRequest,
    UserUpdate,
};

/// POST /auth/register
/// Creates the organization and its admin, then starts a session.
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserView>>), ApiError> {
    let user = state.shared.account_service.register(payload).await?;

    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// POST /auth/set-password
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordTokenRequest>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    let user = state.shared.account_service.set_password(payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.shared.account_service.forgot_password(payload).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the address belongs to an active account, a reset link has been sent",
    ))))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordTokenRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.shared.account_service.reset_password(payload).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// GET /auth/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<UserView>>>, ApiError> {
    let users = state
        .shared
        .account_service
        .list_users(&caller.principal)
        .await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /auth/users/invite
pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<InviteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Invited>>), ApiError> {
    let invited = state
        .shared
        .account_service
        .invite_user(&caller.principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(invited))))
}

/// PUT /auth/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    let user = state
        .shared
        .account_service
        .update_user(&caller.principal, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /auth/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .account_service
        .delete_user(&caller.principal, id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("User deleted"))))
}
