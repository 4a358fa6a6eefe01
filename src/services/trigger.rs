//! Event trigger resolution.
//!
//! External callers name an event by slug; the environment always comes from
//! the API key, never from the request. A resolved event must have both a
//! template and an integration that share its owner and environment before a
//! send is handed to the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::Store;
use crate::domain::{Environment, Principal};
use crate::entities::events;
use crate::services::dispatch::{DispatchError, SendDispatcher, SendJob};

/// Returned for every miss, so callers cannot tell a wrong slug from an
/// inactive event or one in the other environment.
pub const EVENT_NOT_FOUND: &str = "Event not found or inactive in this environment";

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("{}", EVENT_NOT_FOUND)]
    NotFound,

    #[error("{0}")]
    Unprocessable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for TriggerError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for TriggerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    pub event: String,
    pub recipient: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSendRequest {
    pub recipient: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerAccepted {
    pub task_id: String,
    pub environment: Environment,
}

pub struct TriggerService {
    store: Store,
    dispatcher: Arc<dyn SendDispatcher>,
}

impl TriggerService {
    #[must_use]
    pub fn new(store: Store, dispatcher: Arc<dyn SendDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Finds the owner's active event with `slug` in `environment` and checks
    /// that it is fully configured.
    ///
    /// # Errors
    ///
    /// [`TriggerError::NotFound`] when no such active event exists and
    /// [`TriggerError::Unprocessable`] when its template or integration is
    /// missing or belongs to another owner or environment.
    pub async fn resolve_trigger(
        &self,
        owner_id: i32,
        slug: &str,
        environment: Environment,
    ) -> Result<events::Model, TriggerError> {
        let event = self
            .store
            .event_repo()
            .find_active_by_slug(owner_id, environment, slug.trim())
            .await?
            .ok_or(TriggerError::NotFound)?;

        self.ensure_configured(&event).await?;
        Ok(event)
    }

    /// API-key trigger: resolve, then enqueue.
    pub async fn trigger(
        &self,
        principal: &Principal,
        environment: Environment,
        request: TriggerRequest,
    ) -> Result<TriggerAccepted, TriggerError> {
        let recipient = validate_recipient(&request.recipient)?;
        let event = self
            .resolve_trigger(principal.user_id, &request.event, environment)
            .await?;

        self.enqueue(&event, recipient, request.data).await
    }

    /// Interactive test send of an event the caller can see.
    pub async fn test_send(
        &self,
        principal: &Principal,
        environment: Environment,
        event_id: i32,
        request: TestSendRequest,
    ) -> Result<TriggerAccepted, TriggerError> {
        let recipient = validate_recipient(&request.recipient)?;
        let event = self
            .store
            .event_repo()
            .get_visible(principal, environment, event_id)
            .await?
            .ok_or(TriggerError::NotFound)?;

        self.ensure_configured(&event).await?;
        self.enqueue(&event, recipient, request.data).await
    }

    async fn ensure_configured(&self, event: &events::Model) -> Result<(), TriggerError> {
        let Some(template_id) = event.template_id else {
            return Err(TriggerError::Unprocessable(
                "Event has no template configured.".to_string(),
            ));
        };
        let Some(integration_id) = event.integration_id else {
            return Err(TriggerError::Unprocessable(
                "Event has no integration configured.".to_string(),
            ));
        };

        let template_matches = self
            .store
            .template_repo()
            .get(template_id)
            .await?
            .is_some_and(|t| t.user_id == event.user_id && t.environment == event.environment);
        if !template_matches {
            return Err(TriggerError::Unprocessable(format!(
                "Event template is not available in the {} environment.",
                event.environment
            )));
        }

        let integration_matches = self
            .store
            .integration_repo()
            .get(integration_id)
            .await?
            .is_some_and(|i| i.user_id == event.user_id && i.environment == event.environment);
        if !integration_matches {
            return Err(TriggerError::Unprocessable(format!(
                "Event integration is not available in the {} environment.",
                event.environment
            )));
        }

        Ok(())
    }

    async fn enqueue(
        &self,
        event: &events::Model,
        recipient: String,
        context: Map<String, Value>,
    ) -> Result<TriggerAccepted, TriggerError> {
        let handle = self
            .dispatcher
            .enqueue(SendJob {
                event_id: event.id,
                recipient,
                context,
            })
            .await?;

        info!(
            event = "send_enqueued",
            user_id = event.user_id,
            environment = %event.environment,
            slug = %event.slug,
            task_id = %handle.task_id,
            "Send enqueued"
        );

        Ok(TriggerAccepted {
            task_id: handle.task_id,
            environment: event.environment,
        })
    }
}

fn validate_recipient(recipient: &str) -> Result<String, TriggerError> {
    let recipient = recipient.trim();
    let valid = recipient
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        })
        && !recipient.contains(char::is_whitespace);

    if valid {
        Ok(recipient.to_string())
    } else {
        Err(TriggerError::Validation(
            "recipient must be a valid email address".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_validation() {
        assert_eq!(
            validate_recipient(" buyer@example.com ").unwrap(),
            "buyer@example.com"
        );
        assert!(validate_recipient("nobody").is_err());
        assert!(validate_recipient("@example.com").is_err());
        assert!(validate_recipient("a@localhost").is_err());
        assert!(validate_recipient("a b@example.com").is_err());
    }

    #[test]
    fn not_found_message_is_fixed() {
        assert_eq!(TriggerError::NotFound.to_string(), EVENT_NOT_FOUND);
    }
}
