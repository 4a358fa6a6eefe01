use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AccountError, ApiKeyError, ResourceError, TriggerError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    UpstreamError { service: String, message: String },

    ValidationError(String),

    /// Operation not allowed for the resource's current state.
    InvalidState(String),

    Unprocessable(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::UpstreamError { service, message } => write!(f, "{service} error: {message}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            Self::Unprocessable(msg) => write!(f, "Unprocessable: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::UpstreamError { service, message } => {
                tracing::warn!("{} error: {}", service, message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("{service} is unavailable"),
                )
            }
            Self::ValidationError(msg) | Self::InvalidState(msg) | Self::Unprocessable(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound(_) => Self::NotFound(err.to_string()),
            ResourceError::InvalidState(msg) => Self::InvalidState(msg),
            ResourceError::Unprocessable(msg) => Self::Unprocessable(msg),
            ResourceError::Validation(msg) => Self::ValidationError(msg),
            ResourceError::Conflict(msg) => Self::Conflict(msg),
            ResourceError::Database(msg) => Self::DatabaseError(msg),
            ResourceError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<ApiKeyError> for ApiError {
    fn from(err: ApiKeyError) -> Self {
        match err {
            ApiKeyError::Unauthenticated => Self::Unauthorized(err.to_string()),
            ApiKeyError::Forbidden => Self::Forbidden(err.to_string()),
            ApiKeyError::NotFound => Self::NotFound(err.to_string()),
            ApiKeyError::Validation(msg) => Self::ValidationError(msg),
            ApiKeyError::Database(msg) => Self::DatabaseError(msg),
            ApiKeyError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<TriggerError> for ApiError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::NotFound => Self::NotFound(err.to_string()),
            TriggerError::Unprocessable(msg) => Self::Unprocessable(msg),
            TriggerError::Validation(msg) => Self::ValidationError(msg),
            TriggerError::Dispatch(e) => Self::UpstreamError {
                service: "Send dispatcher".to_string(),
                message: e.to_string(),
            },
            TriggerError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Unauthenticated(msg) => Self::Unauthorized(msg),
            AccountError::Forbidden(msg) => Self::Forbidden(msg),
            AccountError::NotFound => Self::NotFound(err.to_string()),
            AccountError::Validation(msg) => Self::ValidationError(msg),
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::Database(msg) => Self::DatabaseError(msg),
            AccountError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unprocessable("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (
                ApiError::UpstreamError {
                    service: "relay".into(),
                    message: "down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn trigger_not_found_keeps_fixed_message() {
        let err = ApiError::from(TriggerError::NotFound);
        assert!(matches!(
            err,
            ApiError::NotFound(ref msg) if msg == crate::services::trigger::EVENT_NOT_FOUND
        ));
    }
}
