use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `security.credential_key`.
pub const CREDENTIAL_KEY_ENV: &str = "XYNO_CREDENTIAL_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub delivery: DeliveryConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/xyno.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Idle minutes before an interactive session expires.
    pub session_idle_minutes: i64,

    /// Public URL of the dashboard, used in invitation and reset links.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8040,
            cors_allowed_origins: vec![
                "http://localhost:8040".to_string(),
                "http://127.0.0.1:8040".to_string(),
            ],
            secure_cookies: true,
            session_idle_minutes: 60,
            public_url: "http://localhost:8040".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Base64 encoded 32-byte key for provider credentials at rest.
    /// `XYNO_CREDENTIAL_KEY` takes precedence when set.
    pub credential_key: String,

    pub invite_token_ttl_hours: i64,

    pub reset_token_ttl_hours: i64,

    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            credential_key: String::new(),
            invite_token_ttl_hours: 72,
            reset_token_ttl_hours: 2,
            min_password_length: 8,
        }
    }
}

impl SecurityConfig {
    /// The credential key, preferring the environment over the file.
    #[must_use]
    pub fn resolved_credential_key(&self) -> Option<String> {
        std::env::var(CREDENTIAL_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                let key = self.credential_key.trim();
                (!key.is_empty()).then(|| key.to_string())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Records messages in the log instead of sending them.
    #[default]
    Log,
    /// POSTs each message to `delivery.relay_url`.
    HttpRelay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub transport: TransportKind,

    pub relay_url: String,

    pub relay_timeout_seconds: u64,

    /// Attempts per send before the log is marked failed (default: 3)
    pub max_attempts: u32,

    /// Seconds to wait between attempts (default: 60)
    pub retry_base_delay_secs: u64,

    /// Pending logs untouched for this long are failed by the sweep.
    pub stale_pending_minutes: i64,

    /// Cron expression (with seconds) for the reconciliation sweep.
    pub reconcile_cron: String,

    pub reconcile_enabled: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Log,
            relay_url: String::new(),
            relay_timeout_seconds: 30,
            max_attempts: 3,
            retry_base_delay_secs: 60,
            stale_pending_minutes: 30,
            reconcile_cron: "0 */5 * * * *".to_string(),
            reconcile_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "xyno".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("xyno").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".xyno").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes a default config, with a freshly generated credential key, if
    /// none exists yet.
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let mut config = Self::default();
            config.security.credential_key = crate::services::CredentialCipher::generate_key();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        if self.delivery.max_attempts == 0 {
            anyhow::bail!("delivery.max_attempts must be at least 1");
        }

        if self.delivery.transport == TransportKind::HttpRelay && self.delivery.relay_url.is_empty()
        {
            anyhow::bail!("delivery.relay_url cannot be empty when the http_relay transport is used");
        }

        if self.delivery.stale_pending_minutes <= 0 {
            anyhow::bail!("delivery.stale_pending_minutes must be positive");
        }

        if self.security.invite_token_ttl_hours <= 0 || self.security.reset_token_ttl_hours <= 0 {
            anyhow::bail!("token lifetimes must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.delivery.max_attempts, 3);
        assert_eq!(config.delivery.retry_base_delay_secs, 60);
        assert_eq!(config.delivery.stale_pending_minutes, 30);
        assert_eq!(config.delivery.transport, TransportKind::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[delivery]"));
        assert!(toml_str.contains("[security]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [delivery]
            transport = "http_relay"
            relay_url = "http://relay.internal/send"
            max_attempts = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.delivery.transport, TransportKind::HttpRelay);
        assert_eq!(config.delivery.max_attempts, 5);
        assert_eq!(config.delivery.retry_base_delay_secs, 60);
        assert_eq!(config.server.port, 8040);
    }

    #[test]
    fn relay_transport_requires_url() {
        let mut config = Config::default();
        config.delivery.transport = TransportKind::HttpRelay;
        assert!(config.validate().is_err());

        config.delivery.relay_url = "http://relay.internal/send".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let mut config = Config::default();
        config.delivery.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
