use sea_orm::entity::prelude::*;

use crate::domain::{Environment, ScopePolicy, ScopedResource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "email_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub environment: Environment,

    /// Natural key, unique per (user, environment).
    pub name: String,

    pub subject: String,

    pub html_content: String,

    /// Editor state, stored verbatim as JSON text.
    pub design_json: Option<String>,

    /// JSON array of `{name, default_value}` objects.
    pub placeholders: String,

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
