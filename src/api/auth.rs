use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::{Environment, Principal, resolve_environment};
use crate::services::UserView;
use crate::services::account_service::LoginRequest;

pub const SESSION_USER_KEY: &str = "user";
pub const ENVIRONMENT_HEADER: &str = "X-Environment";

/// Who is calling and which environment the request operates in.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    pub environment: Environment,
    /// Set when the request authenticated with an API key.
    pub api_key_id: Option<i32>,
}

/// Authentication middleware that checks:
/// 1. Session cookie (from login), environment from `X-Environment`
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
///
/// API-key requests always operate in the key's environment.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = if let Some(principal) = session_principal(&state, &session).await? {
        let requested = headers
            .get(ENVIRONMENT_HEADER)
            .and_then(|v| v.to_str().ok());
        Caller {
            environment: resolve_environment(Some(&principal), requested),
            principal,
            api_key_id: None,
        }
    } else if let Some(key) = extract_api_key(&headers) {
        api_key_caller(&state, &key).await?
    } else {
        return Err(ApiError::unauthorized("Authentication required"));
    };

    Ok(run_as(&state, caller, request, next).await)
}

/// Accepts API keys only. Used by the external trigger endpoint.
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_api_key(&headers)
        .ok_or_else(|| ApiError::unauthorized("API key required"))?;
    let caller = api_key_caller(&state, &key).await?;
    Ok(run_as(&state, caller, request, next).await)
}

async fn run_as(state: &Arc<AppState>, caller: Caller, mut request: Request, next: Next) -> Response {
    tracing::Span::current().record("user_id", caller.principal.user_id);
    let api_key_id = caller.api_key_id;
    request.extensions_mut().insert(caller);

    let response = next.run(request).await;

    // Usage timestamp is recorded after the response and never affects it.
    if let Some(key_id) = api_key_id {
        let keys = state.shared.api_key_service.clone();
        tokio::spawn(async move {
            if let Err(e) = keys.touch_last_used(key_id).await {
                tracing::warn!(
                    event = "api_key_touch_failed",
                    key_id,
                    error = %e,
                    "Failed to record API key usage"
                );
            }
        });
    }

    response
}

async fn api_key_caller(state: &AppState, raw_key: &str) -> Result<Caller, ApiError> {
    let (user, key) = state.shared.api_key_service.authenticate(raw_key).await?;
    Ok(Caller {
        principal: Principal::from(&user),
        environment: key.environment,
        api_key_id: Some(key.id),
    })
}

async fn session_principal(
    state: &AppState,
    session: &Session,
) -> Result<Option<Principal>, ApiError> {
    let Some(user_id) = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
    else {
        return Ok(None);
    };

    let user = state.store().user_repo().get_by_id(user_id).await?;
    Ok(user.filter(|u| u.is_active).map(|u| Principal::from(&u)))
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state.shared.account_service.login(payload).await?;

    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!(event = "user_login", user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::success(user)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    let user = state
        .shared
        .account_service
        .current_user(caller.principal.user_id)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_header_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", HeaderValue::from_static("from-header"));
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn bearer_token_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer  abc123 "));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("abc123"));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_api_key(&headers), None);
    }
}
