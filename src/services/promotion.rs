//! Sandbox to production promotion.
//!
//! A promotion looks up the production row with the same owner and natural
//! key, overwrites it or inserts a new one, and never touches the sandbox
//! source. There is no persisted link between the two rows; matching is
//! repeated on every call. Each promotion runs in one transaction and the
//! natural-key unique indexes turn a lost race into a conflict.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::db::{Store, now_timestamp};
use crate::domain::{Environment, PromotableKind, PromotionOutcome};
use crate::entities::{email_templates, events, integrations};
use crate::services::catalog_service::{Promoted, ResourceError};

pub const NOT_SANDBOX_MESSAGE: &str = "Only sandbox resources can be promoted";

#[must_use]
pub fn missing_template_warning(name: &str) -> String {
    format!("Template \"{name}\" has not been promoted to production yet.")
}

#[must_use]
pub fn missing_integration_warning(name: &str) -> String {
    format!("Integration \"{name}\" has not been configured for production yet.")
}

fn ensure_sandbox(environment: Environment) -> Result<(), ResourceError> {
    match environment {
        Environment::Sandbox => Ok(()),
        Environment::Production => Err(ResourceError::InvalidState(NOT_SANDBOX_MESSAGE.to_string())),
    }
}

fn record(kind: PromotableKind, user_id: i32, id: i32, outcome: PromotionOutcome, warnings: usize) {
    metrics::counter!(
        "promotions_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    info!(
        event = "resource_promoted",
        kind = %kind,
        user_id,
        production_id = id,
        outcome = %outcome,
        warnings,
        "Promoted {} to production",
        kind
    );
}

pub struct PromotionEngine {
    conn: DatabaseConnection,
}

impl PromotionEngine {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            conn: store.conn.clone(),
        }
    }

    pub async fn promote_template(
        &self,
        source: &email_templates::Model,
    ) -> Result<Promoted<email_templates::Model>, ResourceError> {
        ensure_sandbox(source.environment)?;

        let txn = self.conn.begin().await?;
        let now = now_timestamp();

        let existing = production_template(&txn, source.user_id, &source.name).await?;

        let (model, outcome) = match existing {
            Some(row) => {
                let mut active = row.into_active_model();
                active.subject = Set(source.subject.clone());
                active.html_content = Set(source.html_content.clone());
                active.design_json = Set(source.design_json.clone());
                active.placeholders = Set(source.placeholders.clone());
                active.is_active = Set(source.is_active);
                active.updated_at = Set(now);
                (active.update(&txn).await?, PromotionOutcome::Updated)
            }
            None => {
                let active = email_templates::ActiveModel {
                    user_id: Set(source.user_id),
                    environment: Set(Environment::Production),
                    name: Set(source.name.clone()),
                    subject: Set(source.subject.clone()),
                    html_content: Set(source.html_content.clone()),
                    design_json: Set(source.design_json.clone()),
                    placeholders: Set(source.placeholders.clone()),
                    is_active: Set(source.is_active),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                (active.insert(&txn).await?, PromotionOutcome::Created)
            }
        };

        txn.commit().await?;
        record(PromotableKind::Template, source.user_id, model.id, outcome, 0);

        Ok(Promoted {
            resource: model,
            outcome,
            warnings: Vec::new(),
        })
    }

    /// Ciphertexts are copied as-is. `is_verified` starts false on a new
    /// production row and is cleared on an existing one only when the sender
    /// address changes.
    pub async fn promote_integration(
        &self,
        source: &integrations::Model,
    ) -> Result<Promoted<integrations::Model>, ResourceError> {
        ensure_sandbox(source.environment)?;

        let txn = self.conn.begin().await?;
        let now = now_timestamp();

        let existing = production_integration(&txn, source.user_id, &source.name).await?;

        let (model, outcome) = match existing {
            Some(row) => {
                let sender_changed = row.sender_email != source.sender_email;
                let mut active = row.into_active_model();
                active.access_key_encrypted = Set(source.access_key_encrypted.clone());
                active.secret_key_encrypted = Set(source.secret_key_encrypted.clone());
                active.region = Set(source.region.clone());
                active.sender_email = Set(source.sender_email.clone());
                if sender_changed {
                    active.is_verified = Set(false);
                }
                active.is_active = Set(source.is_active);
                active.updated_at = Set(now);
                (active.update(&txn).await?, PromotionOutcome::Updated)
            }
            None => {
                let active = integrations::ActiveModel {
                    user_id: Set(source.user_id),
                    environment: Set(Environment::Production),
                    name: Set(source.name.clone()),
                    access_key_encrypted: Set(source.access_key_encrypted.clone()),
                    secret_key_encrypted: Set(source.secret_key_encrypted.clone()),
                    region: Set(source.region.clone()),
                    sender_email: Set(source.sender_email.clone()),
                    is_verified: Set(false),
                    is_active: Set(source.is_active),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                (active.insert(&txn).await?, PromotionOutcome::Created)
            }
        };

        txn.commit().await?;
        record(PromotableKind::Integration, source.user_id, model.id, outcome, 0);

        Ok(Promoted {
            resource: model,
            outcome,
            warnings: Vec::new(),
        })
    }

    /// References are re-resolved by name among the owner's production rows.
    /// A reference without a production counterpart is dropped and reported
    /// as a warning, template first.
    pub async fn promote_event(
        &self,
        source: &events::Model,
    ) -> Result<Promoted<events::Model>, ResourceError> {
        ensure_sandbox(source.environment)?;

        let txn = self.conn.begin().await?;
        let now = now_timestamp();
        let mut warnings = Vec::new();

        let sandbox_template = match source.template_id {
            Some(id) => email_templates::Entity::find_by_id(id).one(&txn).await?,
            None => None,
        };
        let production_template_id = match &sandbox_template {
            Some(template) => {
                let found = production_template(&txn, source.user_id, &template.name).await?;
                if found.is_none() {
                    warnings.push(missing_template_warning(&template.name));
                }
                found.map(|t| t.id)
            }
            None => None,
        };

        let sandbox_integration = match source.integration_id {
            Some(id) => integrations::Entity::find_by_id(id).one(&txn).await?,
            None => None,
        };
        let production_integration_id = match &sandbox_integration {
            Some(integration) => {
                let found = production_integration(&txn, source.user_id, &integration.name).await?;
                if found.is_none() {
                    warnings.push(missing_integration_warning(&integration.name));
                }
                found.map(|i| i.id)
            }
            None => None,
        };

        let existing = events::Entity::find()
            .filter(events::Column::UserId.eq(source.user_id))
            .filter(events::Column::Environment.eq(Environment::Production))
            .filter(events::Column::Slug.eq(source.slug.as_str()))
            .one(&txn)
            .await?;

        let (model, outcome) = match existing {
            Some(row) => {
                let mut active = row.into_active_model();
                active.name = Set(source.name.clone());
                active.description = Set(source.description.clone());
                active.template_id = Set(production_template_id);
                active.integration_id = Set(production_integration_id);
                active.is_active = Set(source.is_active);
                active.updated_at = Set(now);
                (active.update(&txn).await?, PromotionOutcome::Updated)
            }
            None => {
                let active = events::ActiveModel {
                    user_id: Set(source.user_id),
                    environment: Set(Environment::Production),
                    name: Set(source.name.clone()),
                    slug: Set(source.slug.clone()),
                    description: Set(source.description.clone()),
                    template_id: Set(production_template_id),
                    integration_id: Set(production_integration_id),
                    is_active: Set(source.is_active),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                (active.insert(&txn).await?, PromotionOutcome::Created)
            }
        };

        txn.commit().await?;
        record(
            PromotableKind::Event,
            source.user_id,
            model.id,
            outcome,
            warnings.len(),
        );

        Ok(Promoted {
            resource: model,
            outcome,
            warnings,
        })
    }
}

async fn production_template(
    txn: &DatabaseTransaction,
    user_id: i32,
    name: &str,
) -> Result<Option<email_templates::Model>, sea_orm::DbErr> {
    email_templates::Entity::find()
        .filter(email_templates::Column::UserId.eq(user_id))
        .filter(email_templates::Column::Environment.eq(Environment::Production))
        .filter(email_templates::Column::Name.eq(name))
        .one(txn)
        .await
}

async fn production_integration(
    txn: &DatabaseTransaction,
    user_id: i32,
    name: &str,
) -> Result<Option<integrations::Model>, sea_orm::DbErr> {
    integrations::Entity::find()
        .filter(integrations::Column::UserId.eq(user_id))
        .filter(integrations::Column::Environment.eq(Environment::Production))
        .filter(integrations::Column::Name.eq(name))
        .one(txn)
        .await
}
