//! `SeaORM` implementation of the `CatalogService` trait.

use async_trait::async_trait;
use sea_orm::{IntoActiveModel, Set};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

use crate::db::Store;
use crate::domain::{Environment, Principal, slugify};
use crate::entities::{email_templates, events, integrations};
use crate::services::catalog_service::{
    CatalogService, EventInput, EventUpdate, EventView, IntegrationInput, IntegrationUpdate,
    IntegrationView, Promoted, ResourceError, TemplateInput, TemplateUpdate, TemplateView,
};
use crate::services::crypto::CredentialCipher;
use crate::services::promotion::PromotionEngine;
use crate::services::render::{
    Placeholder, Rendered, parse_placeholders, placeholders_to_json, render_template,
    sync_placeholders,
};

pub struct SeaOrmCatalogService {
    store: Store,
    cipher: CredentialCipher,
    promotion: PromotionEngine,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub fn new(store: Store, cipher: CredentialCipher) -> Self {
        let promotion = PromotionEngine::new(&store);
        Self {
            store,
            cipher,
            promotion,
        }
    }

    async fn owned_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<email_templates::Model, ResourceError> {
        self.store
            .template_repo()
            .get_owned(principal, env, id)
            .await?
            .ok_or(ResourceError::NotFound("Template"))
    }

    async fn owned_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<integrations::Model, ResourceError> {
        self.store
            .integration_repo()
            .get_owned(principal, env, id)
            .await?
            .ok_or(ResourceError::NotFound("Integration"))
    }

    async fn owned_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<events::Model, ResourceError> {
        self.store
            .event_repo()
            .get_owned(principal, env, id)
            .await?
            .ok_or(ResourceError::NotFound("Event"))
    }

    /// Checks that event references point at the caller's rows in `env`.
    async fn check_references(
        &self,
        principal: &Principal,
        env: Environment,
        template_id: Option<i32>,
        integration_id: Option<i32>,
    ) -> Result<(), ResourceError> {
        if let Some(id) = template_id
            && self
                .store
                .template_repo()
                .get_owned(principal, env, id)
                .await?
                .is_none()
        {
            return Err(ResourceError::Validation(format!(
                "Template {id} does not exist in the {env} environment"
            )));
        }

        if let Some(id) = integration_id
            && self
                .store
                .integration_repo()
                .get_owned(principal, env, id)
                .await?
                .is_none()
        {
            return Err(ResourceError::Validation(format!(
                "Integration {id} does not exist in the {env} environment"
            )));
        }

        Ok(())
    }

    /// Builds the event view, showing reference names only for references
    /// that still match the event's owner and environment.
    async fn event_view(&self, event: events::Model) -> Result<EventView, ResourceError> {
        let template = match event.template_id {
            Some(id) => self
                .store
                .template_repo()
                .get(id)
                .await?
                .filter(|t| t.user_id == event.user_id && t.environment == event.environment),
            None => None,
        };
        let integration = match event.integration_id {
            Some(id) => self
                .store
                .integration_repo()
                .get(id)
                .await?
                .filter(|i| i.user_id == event.user_id && i.environment == event.environment),
            None => None,
        };

        Ok(EventView::new(event, template.as_ref(), integration.as_ref()))
    }
}

fn required(field: &str, value: &str) -> Result<String, ResourceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ResourceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn design_to_text(design: Option<Value>) -> Option<String> {
    design.filter(|v| !v.is_null()).map(|v| v.to_string())
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list_templates(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<TemplateView>, ResourceError> {
        let rows = self.store.template_repo().list_visible(principal, env).await?;
        Ok(rows.into_iter().map(TemplateView::from).collect())
    }

    async fn get_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<TemplateView, ResourceError> {
        self.store
            .template_repo()
            .get_visible(principal, env, id)
            .await?
            .map(TemplateView::from)
            .ok_or(ResourceError::NotFound("Template"))
    }

    async fn create_template(
        &self,
        principal: &Principal,
        env: Environment,
        input: TemplateInput,
    ) -> Result<TemplateView, ResourceError> {
        let name = required("name", &input.name)?;
        let subject = required("subject", &input.subject)?;
        let placeholders = sync_placeholders(&subject, &input.html_content, &[]);

        let active = email_templates::ActiveModel {
            user_id: Set(principal.user_id),
            environment: Set(env),
            name: Set(name),
            subject: Set(subject),
            html_content: Set(input.html_content),
            design_json: Set(design_to_text(input.design_json)),
            placeholders: Set(placeholders_to_json(&placeholders)),
            is_active: Set(input.is_active),
            ..Default::default()
        };

        let template = self.store.template_repo().insert(active).await?;
        info!(
            event = "template_created",
            user_id = principal.user_id,
            environment = %env,
            template_id = template.id,
            "Template created"
        );
        Ok(template.into())
    }

    async fn update_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: TemplateUpdate,
    ) -> Result<TemplateView, ResourceError> {
        let current = self.owned_template(principal, env, id).await?;

        let subject = match update.subject {
            Some(subject) => required("subject", &subject)?,
            None => current.subject.clone(),
        };
        let html = update.html_content.unwrap_or_else(|| current.html_content.clone());
        let placeholders =
            sync_placeholders(&subject, &html, &parse_placeholders(&current.placeholders));

        let mut active = current.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(required("name", &name)?);
        }
        if let Some(design) = update.design_json {
            active.design_json = Set(design_to_text(Some(design)));
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.subject = Set(subject);
        active.html_content = Set(html);
        active.placeholders = Set(placeholders_to_json(&placeholders));

        Ok(self.store.template_repo().update(active).await?.into())
    }

    async fn delete_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError> {
        let template = self.owned_template(principal, env, id).await?;
        self.store.template_repo().delete(template.id).await?;
        info!(
            event = "template_deleted",
            user_id = principal.user_id,
            template_id = id,
            "Template deleted"
        );
        Ok(())
    }

    async fn set_placeholder_defaults(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        defaults: Vec<Placeholder>,
    ) -> Result<TemplateView, ResourceError> {
        let current = self.owned_template(principal, env, id).await?;

        let incoming: HashMap<String, String> = defaults
            .into_iter()
            .map(|p| (p.name, p.default_value))
            .collect();

        let updated: Vec<Placeholder> = parse_placeholders(&current.placeholders)
            .into_iter()
            .map(|p| Placeholder {
                default_value: incoming.get(&p.name).cloned().unwrap_or(p.default_value),
                name: p.name,
            })
            .collect();

        let mut active = current.into_active_model();
        active.placeholders = Set(placeholders_to_json(&updated));

        Ok(self.store.template_repo().update(active).await?.into())
    }

    async fn preview_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        context: Map<String, Value>,
    ) -> Result<Rendered, ResourceError> {
        let template = self
            .store
            .template_repo()
            .get_visible(principal, env, id)
            .await?
            .ok_or(ResourceError::NotFound("Template"))?;

        Ok(render_template(&template, &context))
    }

    async fn promote_template(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<TemplateView>, ResourceError> {
        let source = self.owned_template(principal, env, id).await?;
        let promoted = self.promotion.promote_template(&source).await?;
        Ok(promoted.map(TemplateView::from))
    }

    async fn list_integrations(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<IntegrationView>, ResourceError> {
        let rows = self
            .store
            .integration_repo()
            .list_visible(principal, env)
            .await?;
        Ok(rows.into_iter().map(IntegrationView::from).collect())
    }

    async fn get_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<IntegrationView, ResourceError> {
        self.store
            .integration_repo()
            .get_visible(principal, env, id)
            .await?
            .map(IntegrationView::from)
            .ok_or(ResourceError::NotFound("Integration"))
    }

    async fn create_integration(
        &self,
        principal: &Principal,
        env: Environment,
        input: IntegrationInput,
    ) -> Result<IntegrationView, ResourceError> {
        let name = required("name", &input.name)?;
        let access_key = required("access_key", &input.access_key)?;
        let secret_key = required("secret_key", &input.secret_key)?;
        let sender_email = required("sender_email", &input.sender_email)?;
        let region = required("region", &input.region)?;

        let active = integrations::ActiveModel {
            user_id: Set(principal.user_id),
            environment: Set(env),
            name: Set(name),
            access_key_encrypted: Set(self.cipher.encrypt(&access_key)?),
            secret_key_encrypted: Set(self.cipher.encrypt(&secret_key)?),
            region: Set(region),
            sender_email: Set(sender_email),
            is_verified: Set(false),
            is_active: Set(input.is_active),
            ..Default::default()
        };

        let integration = self.store.integration_repo().insert(active).await?;
        info!(
            event = "integration_created",
            user_id = principal.user_id,
            environment = %env,
            integration_id = integration.id,
            "Integration created"
        );
        Ok(integration.into())
    }

    async fn update_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: IntegrationUpdate,
    ) -> Result<IntegrationView, ResourceError> {
        let current = self.owned_integration(principal, env, id).await?;
        let sender_changed = update
            .sender_email
            .as_deref()
            .is_some_and(|s| s.trim() != current.sender_email);

        let mut active = current.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(required("name", &name)?);
        }
        if let (Some(access_key), Some(secret_key)) = (update.access_key, update.secret_key) {
            let access_key = required("access_key", &access_key)?;
            let secret_key = required("secret_key", &secret_key)?;
            active.access_key_encrypted = Set(self.cipher.encrypt(&access_key)?);
            active.secret_key_encrypted = Set(self.cipher.encrypt(&secret_key)?);
        }
        if let Some(region) = update.region {
            active.region = Set(required("region", &region)?);
        }
        if let Some(sender_email) = update.sender_email {
            active.sender_email = Set(required("sender_email", &sender_email)?);
        }
        if sender_changed {
            active.is_verified = Set(false);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        Ok(self.store.integration_repo().update(active).await?.into())
    }

    async fn delete_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError> {
        let integration = self.owned_integration(principal, env, id).await?;
        self.store.integration_repo().delete(integration.id).await?;
        Ok(())
    }

    async fn promote_integration(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<IntegrationView>, ResourceError> {
        let source = self.owned_integration(principal, env, id).await?;
        let promoted = self.promotion.promote_integration(&source).await?;
        Ok(promoted.map(IntegrationView::from))
    }

    async fn list_events(
        &self,
        principal: &Principal,
        env: Environment,
    ) -> Result<Vec<EventView>, ResourceError> {
        let rows = self.store.event_repo().list_visible(principal, env).await?;
        let mut views = Vec::with_capacity(rows.len());
        for event in rows {
            views.push(self.event_view(event).await?);
        }
        Ok(views)
    }

    async fn get_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<EventView, ResourceError> {
        let event = self
            .store
            .event_repo()
            .get_visible(principal, env, id)
            .await?
            .ok_or(ResourceError::NotFound("Event"))?;
        self.event_view(event).await
    }

    async fn create_event(
        &self,
        principal: &Principal,
        env: Environment,
        input: EventInput,
    ) -> Result<EventView, ResourceError> {
        let name = required("name", &input.name)?;
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(ResourceError::Validation(
                "Event name must contain at least one letter or digit".to_string(),
            ));
        }

        self.check_references(principal, env, input.template_id, input.integration_id)
            .await?;

        let active = events::ActiveModel {
            user_id: Set(principal.user_id),
            environment: Set(env),
            name: Set(name),
            slug: Set(slug),
            description: Set(input.description),
            template_id: Set(input.template_id),
            integration_id: Set(input.integration_id),
            is_active: Set(input.is_active),
            ..Default::default()
        };

        let event = self.store.event_repo().insert(active).await?;
        info!(
            event = "event_created",
            user_id = principal.user_id,
            environment = %env,
            slug = %event.slug,
            "Event created"
        );
        self.event_view(event).await
    }

    async fn update_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
        update: EventUpdate,
    ) -> Result<EventView, ResourceError> {
        let current = self.owned_event(principal, env, id).await?;

        self.check_references(principal, env, update.template_id, update.integration_id)
            .await?;

        let mut active = current.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(required("name", &name)?);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(template_id) = update.template_id {
            active.template_id = Set(Some(template_id));
        }
        if let Some(integration_id) = update.integration_id {
            active.integration_id = Set(Some(integration_id));
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        let event = self.store.event_repo().update(active).await?;
        self.event_view(event).await
    }

    async fn delete_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<(), ResourceError> {
        let event = self.owned_event(principal, env, id).await?;
        self.store.event_repo().delete(event.id).await?;
        Ok(())
    }

    async fn promote_event(
        &self,
        principal: &Principal,
        env: Environment,
        id: i32,
    ) -> Result<Promoted<EventView>, ResourceError> {
        let source = self.owned_event(principal, env, id).await?;
        let promoted = self.promotion.promote_event(&source).await?;

        let Promoted {
            resource,
            outcome,
            warnings,
        } = promoted;

        Ok(Promoted {
            resource: self.event_view(resource).await?,
            outcome,
            warnings,
        })
    }
}
