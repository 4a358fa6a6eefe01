//! Domain service for the environment-scoped catalog: templates,
//! integrations and events.
//!
//! Every operation takes the caller and the environment resolved for the
//! request. Reads go through the resource's scope policy, writes are
//! restricted to rows the caller owns, and anything outside either filter is
//! reported as not found.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::is_unique_violation;
use crate::domain::{Environment, Principal, PromotionOutcome};
use crate::entities::{email_templates, events, integrations};
use crate::services::crypto::CipherError;
use crate::services::render::{Placeholder, Rendered, parse_placeholders};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

const DUPLICATE_MESSAGE: &str = "A resource with this name already exists in this environment";

impl From<sea_orm::DbErr> for ResourceError {
    fn from(err: sea_orm::DbErr) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(DUPLICATE_MESSAGE.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for ResourceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db) if is_unique_violation(db) => Self::Conflict(DUPLICATE_MESSAGE.to_string()),
            _ => Self::Internal(format!("{err:#}")),
        }
    }
}

impl From<CipherError> for ResourceError {
    fn from(err: CipherError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A promoted production row together with what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct Promoted<T> {
    #[serde(flatten)]
    pub resource: T,
    #[serde(skip)]
    pub outcome: PromotionOutcome,
    pub warnings: Vec<String>,
}

impl<T> Promoted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Promoted<U> {
        Promoted {
            resource: f(self.resource),
            outcome: self.outcome,
            warnings: self.warnings,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub design_json: Option<Value>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub html_content: Option<String>,
    pub design_json: Option<Value>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateView {
    pub id: i32,
    pub name: String,
    pub environment: Environment,
    pub subject: String,
    pub html_content: String,
    pub design_json: Option<Value>,
    pub placeholders: Vec<Placeholder>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<email_templates::Model> for TemplateView {
    fn from(t: email_templates::Model) -> Self {
        Self {
            placeholders: parse_placeholders(&t.placeholders),
            design_json: t
                .design_json
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            id: t.id,
            name: t.name,
            environment: t.environment,
            subject: t.subject,
            html_content: t.html_content,
            is_active: t.is_active,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationInput {
    pub name: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub sender_email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Credentials are replaced only when both halves are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationUpdate {
    pub name: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub sender_email: Option<String>,
    pub is_active: Option<bool>,
}

/// Credentials are write-only and never appear here.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationView {
    pub id: i32,
    pub name: String,
    pub environment: Environment,
    pub region: String,
    pub sender_email: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<integrations::Model> for IntegrationView {
    fn from(i: integrations::Model) -> Self {
        Self {
            id: i.id,
            name: i.name,
            environment: i.environment,
            region: i.region,
            sender_email: i.sender_email,
            is_verified: i.is_verified,
            is_active: i.is_active,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub template_id: Option<i32>,
    pub integration_id: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// The slug is derived once at creation and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_id: Option<i32>,
    pub integration_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub environment: Environment,
    pub template_id: Option<i32>,
    pub template_name: Option<String>,
    pub integration_id: Option<i32>,
    pub integration_name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl EventView {
    #[must_use]
    pub fn new(
        event: events::Model,
        template: Option<&email_templates::Model>,
        integration: Option<&integrations::Model>,
    ) -> Self {
        Self {
            id: event.id,
            name: event.name,
            slug: event.slug,
            description: event.description,
            environment: event.environment,
            template_id: event.template_id,
            template_name: template.map(|t| t.name.clone()),
            integration_id: event.integration_id,
            integration_name: integration.map(|i| i.name.clone()),
            is_active: event.is_active,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

const fn default_active() -> bool {
    true
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_templates(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<TemplateView>, ResourceError>;

    async fn get_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<TemplateView, ResourceError>;

    /// Creates a template; placeholders are derived from subject and body.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Conflict`] if the name is taken in `env`.
    async fn create_template(
        &self,
        principal: &Principal,
        env: Environment,
        input: TemplateInput,
    ) -> Result<TemplateView, ResourceError>;

    async fn update_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: TemplateUpdate,
    ) -> Result<TemplateView, ResourceError>;

    async fn delete_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError>;

    /// Sets default values for placeholders the template already uses.
    /// Unknown names are ignored.
    async fn set_placeholder_defaults(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        defaults: Vec<Placeholder>,
    ) -> Result<TemplateView, ResourceError>;

    async fn preview_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        context: Map<String, Value>,
    ) -> Result<Rendered, ResourceError>;

    async fn promote_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<TemplateView>, ResourceError>;

    async fn list_integrations(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<IntegrationView>, ResourceError>;

    async fn get_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<IntegrationView, ResourceError>;

    async fn create_integration(
        &self,
        principal: &Principal,
        env: Environment,
        input: IntegrationInput,
    ) -> Result<IntegrationView, ResourceError>;

    async fn update_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: IntegrationUpdate,
    ) -> Result<IntegrationView, ResourceError>;

    async fn delete_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError>;

    async fn promote_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<IntegrationView>, ResourceError>;

    async fn list_events(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<EventView>, ResourceError>;

    async fn get_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<EventView, ResourceError>;

    /// Creates an event. References must point at the caller's own rows in
    /// the same environment.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Validation`] for a name that yields an empty
    /// slug or a reference outside the caller's environment, and
    /// [`ResourceError::Conflict`] if the slug is taken.
    async fn create_event(
        &self,
        principal: &Principal,
        env: Environment,
        input: EventInput,
    ) -> Result<EventView, ResourceError>;

    async fn update_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: EventUpdate,
    ) -> Result<EventView, ResourceError>;

    async fn delete_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError>;

    /// Promotes a sandbox event, re-pointing its references at production
    /// counterparts.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidState`] if the event is not a sandbox
    /// event.
    async fn promote_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<EventView>, ResourceError>;
}
