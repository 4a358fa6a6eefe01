//! Brand components: reusable HTML snippets shared across an organization.
//!
//! Every member can read the organization's components; only the author can
//! change or delete one.

use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::domain::Principal;
use crate::entities::brand_components::{self, BrandCategory};
use crate::services::catalog_service::ResourceError;

#[derive(Debug, Clone, Deserialize)]
pub struct BrandComponentInput {
    pub name: String,
    #[serde(default)]
    pub category: BrandCategory,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandComponentUpdate {
    pub name: Option<String>,
    pub category: Option<BrandCategory>,
    pub html_content: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrandComponentView {
    pub id: i32,
    pub name: String,
    pub category: BrandCategory,
    pub html_content: String,
    pub thumbnail_url: String,
    pub is_active: bool,
    /// Author of the component.
    pub user_id: i32,
    /// Whether the caller may edit it.
    pub editable: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BrandComponentView {
    fn new(model: brand_components::Model, principal: &Principal) -> Self {
        Self {
            editable: principal.owns(model.user_id),
            id: model.id,
            name: model.name,
            category: model.category,
            html_content: model.html_content,
            thumbnail_url: model.thumbnail_url,
            is_active: model.is_active,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const fn default_active() -> bool {
    true
}

#[derive(Clone)]
pub struct BrandComponentService {
    store: Store,
}

impl BrandComponentService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<BrandComponentView>, ResourceError> {
        let rows = self
            .store
            .brand_component_repo()
            .list_visible(principal)
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| BrandComponentView::new(m, principal))
            .collect())
    }

    pub async fn get(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<BrandComponentView, ResourceError> {
        self.store
            .brand_component_repo()
            .get_visible(principal, id)
            .await?
            .map(|m| BrandComponentView::new(m, principal))
            .ok_or(ResourceError::NotFound("Brand component"))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        input: BrandComponentInput,
    ) -> Result<BrandComponentView, ResourceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ResourceError::Validation("name is required".to_string()));
        }

        let active = brand_components::ActiveModel {
            user_id: Set(principal.user_id),
            name: Set(name.to_string()),
            category: Set(input.category),
            html_content: Set(input.html_content),
            thumbnail_url: Set(input.thumbnail_url),
            is_active: Set(input.is_active),
            ..Default::default()
        };

        let model = self.store.brand_component_repo().insert(active).await?;
        Ok(BrandComponentView::new(model, principal))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i32,
        update: BrandComponentUpdate,
    ) -> Result<BrandComponentView, ResourceError> {
        let current = self
            .store
            .brand_component_repo()
            .get_owned(principal, id)
            .await?
            .ok_or(ResourceError::NotFound("Brand component"))?;

        let mut active = current.into_active_model();
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ResourceError::Validation("name is required".to_string()));
            }
            active.name = Set(name.to_string());
        }
        if let Some(category) = update.category {
            active.category = Set(category);
        }
        if let Some(html) = update.html_content {
            active.html_content = Set(html);
        }
        if let Some(url) = update.thumbnail_url {
            active.thumbnail_url = Set(url);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        let model = self.store.brand_component_repo().update(active).await?;
        Ok(BrandComponentView::new(model, principal))
    }

    pub async fn delete(&self, principal: &Principal, id: i32) -> Result<(), ResourceError> {
        let current = self
            .store
            .brand_component_repo()
            .get_owned(principal, id)
            .await?
            .ok_or(ResourceError::NotFound("Brand component"))?;

        self.store.brand_component_repo().delete(current.id).await?;
        Ok(())
    }
}
