use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::email_log::{DailyCount, LogFilter, LogStats};
pub use repositories::user::{NewUser, hash_password};

/// Renders a timestamp the way every table stores it: RFC 3339, UTC,
/// millisecond precision. The fixed width keeps string comparison in SQL
/// consistent with chronological order.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

/// True when `err` is a unique-index violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn organization_repo(&self) -> repositories::organization::OrganizationRepository {
        repositories::organization::OrganizationRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_token_repo(&self) -> repositories::user_token::UserTokenRepository {
        repositories::user_token::UserTokenRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn template_repo(&self) -> repositories::template::TemplateRepository {
        repositories::template::TemplateRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn integration_repo(&self) -> repositories::integration::IntegrationRepository {
        repositories::integration::IntegrationRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn api_key_repo(&self) -> repositories::api_key::ApiKeyRepository {
        repositories::api_key::ApiKeyRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn email_log_repo(&self) -> repositories::email_log::EmailLogRepository {
        repositories::email_log::EmailLogRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn brand_component_repo(&self) -> repositories::brand_component::BrandComponentRepository {
        repositories::brand_component::BrandComponentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn platform_repo(&self) -> repositories::platform::PlatformMailerRepository {
        repositories::platform::PlatformMailerRepository::new(self.conn.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_have_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        let later = whole + chrono::Duration::milliseconds(7);

        assert_eq!(timestamp(whole), "2026-03-01T09:05:00.000Z");
        assert_eq!(timestamp(later), "2026-03-01T09:05:00.007Z");
        assert!(timestamp(whole) < timestamp(later));
    }
}
