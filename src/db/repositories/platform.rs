use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::now_timestamp;
use crate::entities::platform_mailer::{self, SINGLETON_SLOT};

/// Sender settings for platform notifications, credentials already encrypted.
#[derive(Debug, Clone)]
pub struct MailerSettings {
    pub access_key_encrypted: String,
    pub secret_key_encrypted: String,
    pub region: String,
    pub sender_email: String,
}

pub struct PlatformMailerRepository {
    conn: DatabaseConnection,
}

impl PlatformMailerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self) -> Result<Option<platform_mailer::Model>> {
        platform_mailer::Entity::find()
            .filter(platform_mailer::Column::Slot.eq(SINGLETON_SLOT))
            .one(&self.conn)
            .await
            .context("Failed to query platform mailer")
    }

    /// Inserts the singleton row. Fails with a unique violation if it exists.
    pub async fn initialize(&self, settings: MailerSettings) -> Result<platform_mailer::Model> {
        let now = now_timestamp();
        let active = platform_mailer::ActiveModel {
            slot: Set(SINGLETON_SLOT),
            access_key_encrypted: Set(settings.access_key_encrypted),
            secret_key_encrypted: Set(settings.secret_key_encrypted),
            region: Set(settings.region),
            sender_email: Set(settings.sender_email),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to initialize platform mailer")
    }

    /// Overwrites the singleton row. Fails if it was never initialized.
    pub async fn replace(&self, settings: MailerSettings) -> Result<platform_mailer::Model> {
        let existing = self
            .get()
            .await?
            .ok_or_else(|| anyhow::anyhow!("Platform mailer is not initialized"))?;

        let mut active: platform_mailer::ActiveModel = existing.into();
        active.access_key_encrypted = Set(settings.access_key_encrypted);
        active.secret_key_encrypted = Set(settings.secret_key_encrypted);
        active.region = Set(settings.region);
        active.sender_email = Set(settings.sender_email);
        active.is_active = Set(true);
        active.updated_at = Set(now_timestamp());

        active
            .update(&self.conn)
            .await
            .context("Failed to replace platform mailer")
    }
}
