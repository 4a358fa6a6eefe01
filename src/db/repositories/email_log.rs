use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::{now_timestamp, timestamp};
use crate::domain::scope::visible_to;
use crate::domain::{Environment, Principal};
use crate::entities::email_logs::{self, EmailStatus};
use crate::entities::events;

/// Row written before a send is attempted.
#[derive(Debug, Clone)]
pub struct NewSendLog {
    pub user_id: i32,
    pub environment: Environment,
    pub event_id: Option<i32>,
    pub template_id: Option<i32>,
    pub integration_id: Option<i32>,
    pub recipient: String,
    pub subject: String,
    pub metadata: serde_json::Value,
    pub task_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub status: Option<EmailStatus>,
    /// Case-insensitive substring of the recipient address.
    pub recipient: Option<String>,
    pub event_slug: Option<String>,
    pub sent_after: Option<String>,
    pub sent_before: Option<String>,
    /// Substring matched against recipient and subject.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: String,
    pub sent: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_today: u64,
    pub sent_last_7_days: u64,
    pub sent_last_30_days: u64,
    pub daily_breakdown: Vec<DailyCount>,
}

pub struct EmailLogRepository {
    conn: DatabaseConnection,
}

impl EmailLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create_pending(&self, log: NewSendLog) -> Result<email_logs::Model> {
        let now = now_timestamp();
        let active = email_logs::ActiveModel {
            user_id: Set(log.user_id),
            environment: Set(log.environment),
            event_id: Set(log.event_id),
            template_id: Set(log.template_id),
            integration_id: Set(log.integration_id),
            recipient: Set(log.recipient),
            subject: Set(log.subject),
            status: Set(EmailStatus::Pending),
            provider_message_id: Set(None),
            error_message: Set(None),
            metadata: Set(log.metadata.to_string()),
            task_id: Set(log.task_id),
            attempts: Set(0),
            sent_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to write pending send log")
    }

    pub async fn get(&self, id: i64) -> Result<Option<email_logs::Model>> {
        email_logs::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query send log")
    }

    pub async fn find_by_task(&self, task_id: &str) -> Result<Option<email_logs::Model>> {
        email_logs::Entity::find()
            .filter(email_logs::Column::TaskId.eq(task_id))
            .one(&self.conn)
            .await
            .context("Failed to query send log by task")
    }

    /// Bumps the attempt counter of a pending row.
    pub async fn record_attempt(&self, id: i64) -> Result<()> {
        email_logs::Entity::update_many()
            .col_expr(
                email_logs::Column::Attempts,
                Expr::col(email_logs::Column::Attempts).add(1),
            )
            .col_expr(email_logs::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(email_logs::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record send attempt")?;
        Ok(())
    }

    pub async fn mark_sent(&self, id: i64, provider_message_id: &str) -> Result<()> {
        self.finish(id, EmailStatus::Sent, Some(provider_message_id), None)
            .await
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        self.finish(id, EmailStatus::Failed, None, Some(error)).await
    }

    /// Moves a row out of `pending`. Rows that already reached a terminal
    /// status are left untouched.
    async fn finish(
        &self,
        id: i64,
        status: EmailStatus,
        provider_message_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        email_logs::Entity::update_many()
            .col_expr(email_logs::Column::Status, Expr::value(status))
            .col_expr(
                email_logs::Column::ProviderMessageId,
                Expr::value(provider_message_id.map(str::to_string)),
            )
            .col_expr(
                email_logs::Column::ErrorMessage,
                Expr::value(error.map(str::to_string)),
            )
            .col_expr(email_logs::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(email_logs::Column::Id.eq(id))
            .filter(email_logs::Column::Status.eq(EmailStatus::Pending))
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to record {status:?} for send log {id}"))?;
        Ok(())
    }

    /// Fails every row still `pending` whose last update is older than
    /// `cutoff`. Returns the number of rows changed.
    pub async fn fail_stale_pending(&self, cutoff: DateTime<Utc>, error: &str) -> Result<u64> {
        let result = email_logs::Entity::update_many()
            .col_expr(email_logs::Column::Status, Expr::value(EmailStatus::Failed))
            .col_expr(email_logs::Column::ErrorMessage, Expr::value(error))
            .col_expr(email_logs::Column::UpdatedAt, Expr::value(now_timestamp()))
            .filter(email_logs::Column::Status.eq(EmailStatus::Pending))
            .filter(email_logs::Column::UpdatedAt.lt(timestamp(cutoff)))
            .exec(&self.conn)
            .await
            .context("Failed to fail stale pending send logs")?;

        Ok(result.rows_affected)
    }

    /// One page of the principal's logs in `environment`, newest first,
    /// together with the total number of matching rows.
    pub async fn list(
        &self,
        principal: &Principal,
        environment: Environment,
        filter: &LogFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<email_logs::Model>, u64)> {
        let mut condition = visible_to::<email_logs::Entity>(principal, Some(environment));

        if let Some(status) = filter.status {
            condition = condition.add(email_logs::Column::Status.eq(status));
        }

        if let Some(recipient) = non_empty(filter.recipient.as_deref()) {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col(email_logs::Column::Recipient)))
                    .like(format!("%{}%", recipient.to_lowercase())),
            );
        }

        if let Some(slug) = non_empty(filter.event_slug.as_deref()) {
            condition = condition.add(
                email_logs::Column::EventId.in_subquery(
                    Query::select()
                        .column(events::Column::Id)
                        .from(events::Entity)
                        .and_where(events::Column::Slug.eq(slug))
                        .to_owned(),
                ),
            );
        }

        if let Some(after) = non_empty(filter.sent_after.as_deref()) {
            condition = condition.add(email_logs::Column::SentAt.gte(after));
        }

        if let Some(before) = non_empty(filter.sent_before.as_deref()) {
            condition = condition.add(email_logs::Column::SentAt.lte(before));
        }

        if let Some(term) = non_empty(filter.search.as_deref()) {
            condition = condition.add(
                Condition::any()
                    .add(email_logs::Column::Recipient.contains(term))
                    .add(email_logs::Column::Subject.contains(term)),
            );
        }

        let paginator = email_logs::Entity::find()
            .filter(condition)
            .order_by_desc(email_logs::Column::SentAt)
            .order_by_desc(email_logs::Column::Id)
            .paginate(&self.conn, page_size.max(1));

        let total = paginator
            .num_items()
            .await
            .context("Failed to count send logs")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list send logs")?;

        Ok((items, total))
    }

    pub async fn recent(
        &self,
        principal: &Principal,
        environment: Environment,
        limit: u64,
    ) -> Result<Vec<email_logs::Model>> {
        email_logs::Entity::find()
            .filter(visible_to::<email_logs::Entity>(principal, Some(environment)))
            .order_by_desc(email_logs::Column::SentAt)
            .order_by_desc(email_logs::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent send logs")
    }

    /// Dashboard counters for the principal's logs in `environment`,
    /// computed relative to `now`.
    pub async fn stats(
        &self,
        principal: &Principal,
        environment: Environment,
        now: DateTime<Utc>,
    ) -> Result<LogStats> {
        let scope = visible_to::<email_logs::Entity>(principal, Some(environment));
        let start_of_today = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        let count_sent_since = |since: Option<DateTime<Utc>>| {
            let mut condition = scope
                .clone()
                .add(email_logs::Column::Status.eq(EmailStatus::Sent));
            if let Some(since) = since {
                condition = condition.add(email_logs::Column::SentAt.gte(timestamp(since)));
            }
            email_logs::Entity::find().filter(condition).count(&self.conn)
        };

        let total_sent = count_sent_since(None)
            .await
            .context("Failed to count sent emails")?;
        let sent_today = count_sent_since(Some(start_of_today))
            .await
            .context("Failed to count emails sent today")?;
        let sent_last_7_days = count_sent_since(Some(now - Duration::days(7)))
            .await
            .context("Failed to count emails sent this week")?;
        let sent_last_30_days = count_sent_since(Some(now - Duration::days(30)))
            .await
            .context("Failed to count emails sent this month")?;

        let total_failed = email_logs::Entity::find()
            .filter(
                scope
                    .clone()
                    .add(email_logs::Column::Status.eq(EmailStatus::Failed)),
            )
            .count(&self.conn)
            .await
            .context("Failed to count failed emails")?;

        let window_start = start_of_today - Duration::days(6);
        let rows: Vec<(String, EmailStatus)> = email_logs::Entity::find()
            .select_only()
            .column(email_logs::Column::SentAt)
            .column(email_logs::Column::Status)
            .filter(
                scope
                    .clone()
                    .add(email_logs::Column::SentAt.gte(timestamp(window_start))),
            )
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load daily send breakdown")?;

        Ok(LogStats {
            total_sent,
            total_failed,
            sent_today,
            sent_last_7_days,
            sent_last_30_days,
            daily_breakdown: daily_breakdown(window_start, 7, &rows),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Buckets `(sent_at, status)` rows into `days` consecutive calendar days
/// starting at `start`. Days without traffic are reported as zero.
fn daily_breakdown(
    start: DateTime<Utc>,
    days: i64,
    rows: &[(String, EmailStatus)],
) -> Vec<DailyCount> {
    let mut buckets: BTreeMap<String, DailyCount> = (0..days)
        .map(|offset| {
            let date = (start + Duration::days(offset)).format("%Y-%m-%d").to_string();
            (
                date.clone(),
                DailyCount {
                    date,
                    sent: 0,
                    failed: 0,
                },
            )
        })
        .collect();

    for (sent_at, status) in rows {
        let Some(day) = sent_at.get(..10) else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(day) {
            match status {
                EmailStatus::Sent => bucket.sent += 1,
                EmailStatus::Failed => bucket.failed += 1,
                _ => {}
            }
        }
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn breakdown_fills_quiet_days_with_zero() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let rows = vec![
            ("2026-03-01T10:00:00.000Z".to_string(), EmailStatus::Sent),
            ("2026-03-01T11:00:00.000Z".to_string(), EmailStatus::Failed),
            ("2026-03-03T08:30:00.000Z".to_string(), EmailStatus::Sent),
            ("2026-03-03T09:30:00.000Z".to_string(), EmailStatus::Pending),
            ("2026-02-27T09:30:00.000Z".to_string(), EmailStatus::Sent),
        ];

        let days = daily_breakdown(start, 3, &rows);

        assert_eq!(
            days,
            vec![
                DailyCount {
                    date: "2026-03-01".to_string(),
                    sent: 1,
                    failed: 1
                },
                DailyCount {
                    date: "2026-03-02".to_string(),
                    sent: 0,
                    failed: 0
                },
                DailyCount {
                    date: "2026-03-03".to_string(),
                    sent: 1,
                    failed: 0
                },
            ]
        );
    }

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" a@b.c ")), Some("a@b.c"));
        assert_eq!(non_empty(None), None);
    }
}
