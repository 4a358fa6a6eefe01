//! Asynchronous send dispatch.
//!
//! Trigger resolution only enqueues; the actual send happens on a spawned
//! task that renders the template, keeps a single send-log row up to date
//! and retries transient transport failures.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::DeliveryConfig;
use crate::db::Store;
use crate::db::repositories::email_log::NewSendLog;
use crate::entities::{email_templates, events, integrations};
use crate::services::crypto::CredentialCipher;
use crate::services::render::render_template;
use crate::services::transport::{EmailTransport, OutgoingEmail, ProviderCredentials};

/// One send request, as accepted by the trigger endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SendJob {
    pub event_id: i32,
    pub recipient: String,
    pub context: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Send dispatcher unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SendDispatcher: Send + Sync {
    /// Accepts a job for asynchronous delivery and returns immediately.
    async fn enqueue(&self, job: SendJob) -> Result<TaskHandle, DispatchError>;
}

/// How a delivery task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { log_id: i64, message_id: String },
    Failed { log_id: i64, error: String },
    /// Nothing was logged because the event vanished before the task ran.
    Dropped,
}

/// Performs the send for one job.
pub struct DeliveryWorker {
    store: Store,
    cipher: CredentialCipher,
    transport: Arc<dyn EmailTransport>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(
        store: Store,
        cipher: CredentialCipher,
        transport: Arc<dyn EmailTransport>,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            store,
            cipher,
            transport,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_base_delay_secs),
        }
    }

    pub async fn deliver(&self, task_id: &str, job: &SendJob) -> anyhow::Result<DeliveryOutcome> {
        let Some(event) = self.store.event_repo().get(job.event_id).await? else {
            warn!(
                event = "delivery_dropped",
                event_id = job.event_id,
                "Event no longer exists, nothing to send"
            );
            return Ok(DeliveryOutcome::Dropped);
        };

        let template = match event.template_id {
            Some(id) => self.store.template_repo().get(id).await?,
            None => None,
        };
        let integration = match event.integration_id {
            Some(id) => self.store.integration_repo().get(id).await?,
            None => None,
        };

        let (Some(template), Some(integration)) = (template, integration) else {
            let log = self
                .store
                .email_log_repo()
                .create_pending(self.new_log(task_id, job, &event, None, None, String::new()))
                .await?;
            return self
                .fail(log.id, "event is missing its template or integration")
                .await;
        };

        let rendered = render_template(&template, &job.context);
        let log = self
            .store
            .email_log_repo()
            .create_pending(self.new_log(
                task_id,
                job,
                &event,
                Some(&template),
                Some(&integration),
                rendered.subject.clone(),
            ))
            .await?;

        let credentials = match self.credentials(&integration) {
            Ok(credentials) => credentials,
            Err(e) => return self.fail(log.id, &format!("{e:#}")).await,
        };

        let email = OutgoingEmail {
            from: integration.sender_email.clone(),
            to: job.recipient.clone(),
            subject: rendered.subject,
            html: rendered.html,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.store.email_log_repo().record_attempt(log.id).await?;

            match self.transport.send(&email, &credentials).await {
                Ok(message_id) => {
                    self.store
                        .email_log_repo()
                        .mark_sent(log.id, &message_id)
                        .await?;
                    metrics::counter!(
                        "emails_delivered_total",
                        "environment" => event.environment.as_str(),
                        "status" => "sent"
                    )
                    .increment(1);
                    info!(
                        event = "email_sent",
                        log_id = log.id,
                        attempt,
                        message_id = %message_id,
                        "Email sent"
                    );
                    return Ok(DeliveryOutcome::Sent {
                        log_id: log.id,
                        message_id,
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        event = "email_retry",
                        log_id = log.id,
                        attempt,
                        error = %e,
                        "Send failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    metrics::counter!(
                        "emails_delivered_total",
                        "environment" => event.environment.as_str(),
                        "status" => "failed"
                    )
                    .increment(1);
                    return self.fail(log.id, &e.to_string()).await;
                }
            }
        }
    }

    fn new_log(
        &self,
        task_id: &str,
        job: &SendJob,
        event: &events::Model,
        template: Option<&email_templates::Model>,
        integration: Option<&integrations::Model>,
        subject: String,
    ) -> NewSendLog {
        NewSendLog {
            user_id: event.user_id,
            environment: event.environment,
            event_id: Some(event.id),
            template_id: template.map(|t| t.id),
            integration_id: integration.map(|i| i.id),
            recipient: job.recipient.clone(),
            subject,
            metadata: json!({
                "task_id": task_id,
                "event_slug": event.slug,
                "context": job.context,
            }),
            task_id: task_id.to_string(),
        }
    }

    fn credentials(&self, integration: &integrations::Model) -> anyhow::Result<ProviderCredentials> {
        Ok(ProviderCredentials {
            access_key_id: self
                .cipher
                .decrypt(&integration.access_key_encrypted)
                .context("Failed to decrypt access key")?,
            secret_access_key: self
                .cipher
                .decrypt(&integration.secret_key_encrypted)
                .context("Failed to decrypt secret key")?,
            region: integration.region.clone(),
        })
    }

    async fn fail(&self, log_id: i64, error: &str) -> anyhow::Result<DeliveryOutcome> {
        self.store.email_log_repo().mark_failed(log_id, error).await?;
        warn!(event = "email_failed", log_id, error = %error, "Email delivery failed");
        Ok(DeliveryOutcome::Failed {
            log_id,
            error: error.to_string(),
        })
    }
}

/// In-process dispatcher: every job runs on its own tokio task.
pub struct TokioDispatcher {
    worker: Arc<DeliveryWorker>,
}

impl TokioDispatcher {
    #[must_use]
    pub const fn new(worker: Arc<DeliveryWorker>) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl SendDispatcher for TokioDispatcher {
    async fn enqueue(&self, job: SendJob) -> Result<TaskHandle, DispatchError> {
        let task_id = uuid::Uuid::new_v4().to_string();
        let worker = Arc::clone(&self.worker);
        let span = info_span!("delivery", task_id = %task_id, event_id = job.event_id);

        metrics::counter!("emails_dispatched_total").increment(1);

        let id = task_id.clone();
        tokio::spawn(
            async move {
                if let Err(e) = worker.deliver(&id, &job).await {
                    error!(event = "delivery_error", error = %e, "Delivery task aborted");
                }
            }
            .instrument(span),
        );

        Ok(TaskHandle { task_id })
    }
}
