use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{ScopePolicy, ScopedResource};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum BrandCategory {
    #[sea_orm(string_value = "header")]
    Header,
    #[sea_orm(string_value = "footer")]
    Footer,
    #[sea_orm(string_value = "content")]
    Content,
    #[sea_orm(string_value = "logo")]
    Logo,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "brand_components")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub name: String,

    pub category: BrandCategory,

    pub html_content: String,

    pub thumbnail_url: String,

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

// Shared snippets: every member of the organization can read them.
impl ScopedResource for Entity {
    const POLICY: ScopePolicy = ScopePolicy::OrganizationScoped;

    fn owner_column() -> Column {
        Column::UserId
    }
}
