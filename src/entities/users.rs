use sea_orm::entity::prelude::*;

use crate::domain::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash. Empty until an invited user sets a password.
    pub password_hash: Option<String>,

    pub first_name: String,

    pub last_name: String,

    pub phone: String,

    pub role: Role,

    /// Only null between row creation and organization assignment.
    pub organization_id: Option<i32>,

    /// Invited users stay inactive until they set a password.
    pub is_active: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_delete = "SetNull"
    )]
    Organization,
}

impl ActiveModelBehavior for ActiveModel {}
