use sea_orm::entity::prelude::*;

/// The single row of this table always uses this slot value; the unique
/// index on `slot` keeps a second row out.
pub const SINGLETON_SLOT: i32 = 1;

/// Platform-wide sender used for invitations and password resets.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "platform_mailer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub slot: i32,

    pub access_key_encrypted: String,

    pub secret_key_encrypted: String,

    pub region: String,

    pub sender_email: String,

    pub is_active: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
