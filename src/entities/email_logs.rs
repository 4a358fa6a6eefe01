use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Environment, ScopePolicy, ScopedResource};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "bounced")]
    Bounced,
    #[sea_orm(string_value = "complained")]
    Complained,
}

impl EmailStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "email_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i32,

    pub environment: Environment,

    /// Cleared when the event is deleted.
    pub event_id: Option<i32>,

    pub template_id: Option<i32>,

    pub integration_id: Option<i32>,

    pub recipient: String,

    pub subject: String,

    pub status: EmailStatus,

    pub provider_message_id: Option<String>,

    pub error_message: Option<String>,

    /// JSON object with the context data of the send.
    pub metadata: String,

    pub task_id: String,

    pub attempts: i32,

    pub sent_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::events::Entity",
        from = "Column::EventId",
        to = "super::events::Column::Id",
        on_delete = "SetNull"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::email_templates::Entity",
        from = "Column::TemplateId",
        to = "super::email_templates::Column::Id",
        on_delete = "SetNull"
    )]
    Template,
    #[sea_orm(
        belongs_to = "super::integrations::Entity",
        from = "Column::IntegrationId",
        to = "super::integrations::Column::Id",
        on_delete = "SetNull"
    )]
    Integration,
}

impl ActiveModelBehavior for ActiveModel {}

impl ScopedResource for Entity {
    const POLICY: ScopePolicy = ScopePolicy::OwnerScoped;

    fn owner_column() -> Column {
        Column::UserId
    }

    fn environment_column() -> Option<Column> {
        Some(Column::Environment)
    }
}
