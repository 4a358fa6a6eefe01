use chrono::Utc;
use serde::Serialize;

use crate::db::{LogFilter, LogStats, Store};
use crate::domain::{Environment, Principal};
use crate::entities::email_logs::{self, EmailStatus};
use crate::services::catalog_service::ResourceError;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;
const RECENT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct SendLogView {
    pub id: i64,
    pub environment: Environment,
    pub event_id: Option<i32>,
    pub template_id: Option<i32>,
    pub integration_id: Option<i32>,
    pub recipient: String,
    pub subject: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub task_id: String,
    pub attempts: i32,
    pub sent_at: String,
    pub updated_at: String,
}

impl From<email_logs::Model> for SendLogView {
    fn from(log: email_logs::Model) -> Self {
        Self {
            metadata: serde_json::from_str(&log.metadata).unwrap_or(serde_json::Value::Null),
            id: log.id,
            environment: log.environment,
            event_id: log.event_id,
            template_id: log.template_id,
            integration_id: log.integration_id,
            recipient: log.recipient,
            subject: log.subject,
            status: log.status,
            provider_message_id: log.provider_message_id,
            error_message: log.error_message,
            task_id: log.task_id,
            attempts: log.attempts,
            sent_at: log.sent_at,
            updated_at: log.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub items: Vec<SendLogView>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// Dashboard counters plus the latest sends.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub stats: LogStats,
    pub recent: Vec<SendLogView>,
}

/// Read side of the send log, always scoped to the caller and environment.
#[derive(Clone)]
pub struct LogService {
    store: Store,
}

impl LogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        environment: Environment,
        filter: &LogFilter,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<LogPage, ResourceError> {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let (items, total) = self
            .store
            .email_log_repo()
            .list(principal, environment, filter, page, page_size)
            .await?;

        Ok(LogPage {
            items: items.into_iter().map(SendLogView::from).collect(),
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    pub async fn stats(
        &self,
        principal: &Principal,
        environment: Environment,
    ) -> Result<DashboardStats, ResourceError> {
        let repo = self.store.email_log_repo();
        let stats = repo.stats(principal, environment, Utc::now()).await?;
        let recent = repo.recent(principal, environment, RECENT_LIMIT).await?;

        Ok(DashboardStats {
            stats,
            recent: recent.into_iter().map(SendLogView::from).collect(),
        })
    }
}
