use crate::entities::prelude::*;
use crate::entities::{brand_components, email_templates, events, integrations};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Natural keys are unique per owner and environment. These indexes are what
// turns a lost insert race into a constraint error instead of a duplicate.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("uq_email_templates_owner_env_name")
                    .table(EmailTemplates)
                    .col(email_templates::Column::UserId)
                    .col(email_templates::Column::Environment)
                    .col(email_templates::Column::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_integrations_owner_env_name")
                    .table(Integrations)
                    .col(integrations::Column::UserId)
                    .col(integrations::Column::Environment)
                    .col(integrations::Column::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_events_owner_env_slug")
                    .table(Events)
                    .col(events::Column::UserId)
                    .col(events::Column::Environment)
                    .col(events::Column::Slug)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_brand_components_owner_name")
                    .table(BrandComponents)
                    .col(brand_components::Column::UserId)
                    .col(brand_components::Column::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "uq_brand_components_owner_name",
            "uq_events_owner_env_slug",
            "uq_integrations_owner_env_name",
            "uq_email_templates_owner_env_name",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
