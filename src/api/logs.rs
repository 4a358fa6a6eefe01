use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::Caller;
use super::{ApiError, ApiResponse, AppState};
use crate::db::LogFilter;
use crate::entities::email_logs::EmailStatus;
use crate::services::LogPage;
use crate::services::logs::DashboardStats;

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub status: Option<EmailStatus>,
    pub recipient: Option<String>,
    /// Event slug.
    pub event: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl LogQuery {
    fn filter(&self) -> LogFilter {
        LogFilter {
            status: self.status,
            recipient: self.recipient.clone(),
            event_slug: self.event.clone(),
            sent_after: self.start_date.clone(),
            sent_before: self.end_date.clone(),
            search: self.search.clone(),
        }
    }
}

/// GET /logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ApiResponse<LogPage>>, ApiError> {
    let page = state
        .shared
        .log_service
        .list(
            &caller.principal,
            caller.environment,
            &query.filter(),
            query.page,
            query.page_size,
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /logs/stats
pub async fn log_stats(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state
        .shared
        .log_service
        .stats(&caller.principal, caller.environment)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}
