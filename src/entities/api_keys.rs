use sea_orm::entity::prelude::*;

use crate::domain::{Environment, ScopePolicy, ScopedResource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub name: String,

    /// First characters of the raw key, kept for display.
    pub prefix: String,

    /// SHA-256 hex digest of the raw key.
    #[sea_orm(unique)]
    pub key_hash: String,

    /// Fixed at creation.
    pub environment: Environment,

    pub is_active: bool,

    pub last_used_at: Option<String>,

    pub created_at: String,
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

// Listing shows every key of the owner; each row carries its environment.
impl ScopedResource for Entity {
    const POLICY: ScopePolicy = ScopePolicy::OwnerScoped;

    fn owner_column() -> Column {
        Column::UserId
    }
}
