mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::{Map, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use xyno::db::repositories::email_log::NewSendLog;
use xyno::domain::Environment;
use xyno::entities::email_logs::EmailStatus;
use xyno::services::{
    ABANDONED_ERROR, DeliveryOutcome, DeliveryWorker, EmailTransport, LogTransport,
    OutgoingEmail, ProviderCredentials, SendJob, TransportError,
};

/// Fails every send with the configured error and counts the calls.
struct FailingTransport {
    retryable: bool,
    calls: AtomicU32,
}

impl FailingTransport {
    fn new(retryable: bool) -> Self {
        Self {
            retryable,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl EmailTransport for FailingTransport {
    async fn send(
        &self,
        _email: &OutgoingEmail,
        _credentials: &ProviderCredentials,
    ) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.retryable {
            Err(TransportError::Unavailable("connection reset".to_string()))
        } else {
            Err(TransportError::Rejected("address blacklisted".to_string()))
        }
    }
}

async fn worker(app: &TestApp, transport: Arc<dyn EmailTransport>) -> DeliveryWorker {
    let config = app.state.shared.config().await;
    DeliveryWorker::new(
        app.state.shared.store.clone(),
        app.state.shared.cipher.clone(),
        transport,
        &config.delivery,
    )
}

fn job(event_id: i64) -> SendJob {
    let mut context = Map::new();
    context.insert("name".to_string(), json!("Sam"));
    context.insert("order_id".to_string(), json!(1001));

    SendJob {
        event_id: i32::try_from(event_id).unwrap(),
        recipient: "buyer@example.com".to_string(),
        context,
    }
}

#[tokio::test]
async fn test_successful_delivery_is_logged_and_listed() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let event = app.seed_event(&admin, "sandbox", "Order Shipped").await;

    let worker = worker(&app, Arc::new(LogTransport)).await;
    let outcome = worker
        .deliver("task-42", &job(event["id"].as_i64().unwrap()))
        .await
        .unwrap();

    let DeliveryOutcome::Sent { log_id, message_id } = outcome else {
        panic!("expected a sent outcome, got {outcome:?}");
    };
    assert!(message_id.starts_with("log-"));

    let log = app
        .state
        .shared
        .store
        .email_log_repo()
        .get(log_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, EmailStatus::Sent);
    assert_eq!(log.attempts, 1);
    assert_eq!(log.subject, "Hello Sam");
    assert_eq!(log.task_id, "task-42");
    assert_eq!(log.provider_message_id.as_deref(), Some(message_id.as_str()));

    let listed = app
        .as_user(&admin, None, "GET", "/api/logs?status=sent", None)
        .await;
    assert_eq!(listed.status, StatusCode::OK, "{:?}", listed.body);
    assert_eq!(listed.data()["total"], 1);
    let item = &listed.data()["items"][0];
    assert_eq!(item["recipient"], "buyer@example.com");
    assert_eq!(item["metadata"]["event_slug"], "order_shipped");
    assert_eq!(item["metadata"]["context"]["order_id"], 1001);

    // Logs are partitioned like everything else.
    let production = app
        .as_user(&admin, Some("production"), "GET", "/api/logs", None)
        .await;
    assert_eq!(production.data()["total"], 0);

    let stats = app
        .as_user(&admin, None, "GET", "/api/logs/stats", None)
        .await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.data()["total_sent"], 1);
    assert_eq!(stats.data()["total_failed"], 0);
    assert_eq!(stats.data()["recent"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_on_one_log_row() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let event = app.seed_event(&admin, "sandbox", "Order Shipped").await;

    let transport = Arc::new(FailingTransport::new(true));
    let worker = worker(&app, transport.clone()).await;
    let outcome = worker
        .deliver("task-retry", &job(event["id"].as_i64().unwrap()))
        .await
        .unwrap();

    let DeliveryOutcome::Failed { log_id, error } = outcome else {
        panic!("expected a failed outcome, got {outcome:?}");
    };
    assert!(error.contains("connection reset"));

    let max_attempts = app.state.shared.config().await.delivery.max_attempts;
    assert_eq!(transport.calls.load(Ordering::SeqCst), max_attempts);

    let repo = app.state.shared.store.email_log_repo();
    let log = repo.find_by_task("task-retry").await.unwrap().unwrap();
    assert_eq!(log.id, log_id);
    assert_eq!(log.status, EmailStatus::Failed);
    assert_eq!(log.attempts, i32::try_from(max_attempts).unwrap());
}

#[tokio::test]
async fn test_rejected_message_is_not_retried() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let event = app.seed_event(&admin, "sandbox", "Order Shipped").await;

    let transport = Arc::new(FailingTransport::new(false));
    let worker = worker(&app, transport.clone()).await;
    let outcome = worker
        .deliver("task-rejected", &job(event["id"].as_i64().unwrap()))
        .await
        .unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Failed { .. }));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    let failed = app
        .as_user(&admin, None, "GET", "/api/logs?status=failed", None)
        .await;
    assert_eq!(failed.data()["total"], 1);
    assert_eq!(failed.data()["items"][0]["attempts"], 1);
}

#[tokio::test]
async fn test_deleted_event_is_dropped() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let event = app.seed_event(&admin, "sandbox", "Order Shipped").await;
    let id = event["id"].as_i64().unwrap();

    let deleted = app
        .as_user(
            &admin,
            None,
            "DELETE",
            &format!("/api/events/definitions/{id}"),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let worker = worker(&app, Arc::new(LogTransport)).await;
    let outcome = worker.deliver("task-gone", &job(id)).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Dropped);

    let repo = app.state.shared.store.email_log_repo();
    assert!(repo.find_by_task("task-gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reconcile_fails_only_stale_pending_logs() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let me = app.as_user(&admin, None, "GET", "/api/auth/me", None).await;
    let user_id = i32::try_from(me.data()["id"].as_i64().unwrap()).unwrap();

    let repo = app.state.shared.store.email_log_repo();
    let pending = |task_id: &str| NewSendLog {
        user_id,
        environment: Environment::Sandbox,
        event_id: None,
        template_id: None,
        integration_id: None,
        recipient: "buyer@example.com".to_string(),
        subject: "Hello".to_string(),
        metadata: json!({}),
        task_id: task_id.to_string(),
    };

    let stuck = repo.create_pending(pending("task-stuck")).await.unwrap();
    let finished = repo.create_pending(pending("task-done")).await.unwrap();
    repo.mark_sent(finished.id, "msg-1").await.unwrap();

    // Nothing is stale yet.
    assert_eq!(app.state.shared.reconcile.sweep().await.unwrap(), 0);

    let later = Utc::now() + Duration::hours(2);
    assert_eq!(app.state.shared.reconcile.sweep_at(later).await.unwrap(), 1);

    let stuck = repo.get(stuck.id).await.unwrap().unwrap();
    assert_eq!(stuck.status, EmailStatus::Failed);
    assert_eq!(stuck.error_message.as_deref(), Some(ABANDONED_ERROR));

    let finished = repo.get(finished.id).await.unwrap().unwrap();
    assert_eq!(finished.status, EmailStatus::Sent);

    // A second sweep has nothing left to do.
    assert_eq!(app.state.shared.reconcile.sweep_at(later).await.unwrap(), 0);
}
