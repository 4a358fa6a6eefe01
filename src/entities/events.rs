use sea_orm::entity::prelude::*;

use crate::domain::{Environment, ScopePolicy, ScopedResource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub environment: Environment,

    pub name: String,

    /// Natural key derived from the name at creation, never changed after.
    pub slug: String,

    pub description: String,

    /// Expected to point at a template with the same owner and environment.
    pub template_id: Option<i32>,

    /// Expected to point at an integration with the same owner and environment.
    pub integration_id: Option<i32>,

    pub is_active: bool,

    pub created_at: String,

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
