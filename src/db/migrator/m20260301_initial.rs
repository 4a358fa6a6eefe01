use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Referenced tables first so foreign keys resolve.
        let tables = [
            schema.create_table_from_entity(Organizations),
            schema.create_table_from_entity(Users),
            schema.create_table_from_entity(EmailTemplates),
            schema.create_table_from_entity(Integrations),
            schema.create_table_from_entity(Events),
            schema.create_table_from_entity(ApiKeys),
            schema.create_table_from_entity(EmailLogs),
            schema.create_table_from_entity(UserTokens),
            schema.create_table_from_entity(BrandComponents),
            schema.create_table_from_entity(PlatformMailer),
        ];

        for mut table in tables {
            manager.create_table(table.if_not_exists().to_owned()).await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_user_env_sent")
                    .table(EmailLogs)
                    .col(crate::entities::email_logs::Column::UserId)
                    .col(crate::entities::email_logs::Column::Environment)
                    .col(crate::entities::email_logs::Column::SentAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_status_updated")
                    .table(EmailLogs)
                    .col(crate::entities::email_logs::Column::Status)
                    .col(crate::entities::email_logs::Column::UpdatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlatformMailer).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BrandComponents).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserTokens).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailLogs).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiKeys).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Integrations).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailTemplates).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations).if_exists().to_owned())
            .await?;

        Ok(())
    }
}
