//! Outbound mail delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{DeliveryConfig, TransportKind};

#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider refused the message; retrying will not help.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or failed transiently.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Decrypted provider credentials, only ever held in memory for one send.
#[derive(Clone, Serialize)]
pub struct ProviderCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Sends one message and returns the provider's message id.
    async fn send(
        &self,
        email: &OutgoingEmail,
        credentials: &ProviderCredentials,
    ) -> Result<String, TransportError>;
}

/// Writes messages to the log and reports success.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(
        &self,
        email: &OutgoingEmail,
        credentials: &ProviderCredentials,
    ) -> Result<String, TransportError> {
        let message_id = format!("log-{}", uuid::Uuid::new_v4());
        info!(
            event = "email_logged",
            message_id = %message_id,
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            region = %credentials.region,
            body_bytes = email.html.len(),
            "Email recorded by log transport"
        );
        Ok(message_id)
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    #[serde(flatten)]
    email: &'a OutgoingEmail,
    credentials: &'a ProviderCredentials,
}

#[derive(Deserialize)]
struct RelayResponse {
    message_id: String,
}

/// Hands messages to an HTTP relay that talks to the provider.
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpRelayTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Xyno/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build relay HTTP client: {e}"))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EmailTransport for HttpRelayTransport {
    async fn send(
        &self,
        email: &OutgoingEmail,
        credentials: &ProviderCredentials,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest { email, credentials })
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(TransportError::Unavailable(format!("relay returned {status}")));
        }

        let body: RelayResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Unavailable(format!("unreadable relay response: {e}")))?;

        Ok(body.message_id)
    }
}

/// Builds the transport selected in `delivery.transport`.
pub fn build_transport(config: &DeliveryConfig) -> anyhow::Result<std::sync::Arc<dyn EmailTransport>> {
    Ok(match config.transport {
        TransportKind::Log => std::sync::Arc::new(LogTransport),
        TransportKind::HttpRelay => std::sync::Arc::new(HttpRelayTransport::new(
            config.relay_url.clone(),
            Duration::from_secs(config.relay_timeout_seconds),
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};

    fn message() -> OutgoingEmail {
        OutgoingEmail {
            from: "noreply@shop.test".to_string(),
            to: "buyer@example.com".to_string(),
            subject: "Receipt".to_string(),
            html: "<p>Thanks</p>".to_string(),
        }
    }

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "shh".to_string(),
            region: "eu-west-1".to_string(),
        }
    }

    async fn spawn_relay(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/send")
    }

    #[tokio::test]
    async fn log_transport_returns_message_id() {
        let id = LogTransport.send(&message(), &credentials()).await.unwrap();
        assert!(id.starts_with("log-"));
    }

    #[tokio::test]
    async fn relay_success_returns_provider_id() {
        let router = Router::new().route(
            "/send",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["to"], "buyer@example.com");
                assert_eq!(body["credentials"]["region"], "eu-west-1");
                Json(serde_json::json!({"message_id": "relay-42"}))
            }),
        );
        let url = spawn_relay(router).await;

        let transport = HttpRelayTransport::new(url, Duration::from_secs(5)).unwrap();
        let id = transport.send(&message(), &credentials()).await.unwrap();
        assert_eq!(id, "relay-42");
    }

    #[tokio::test]
    async fn relay_errors_are_classified() {
        let router = Router::new()
            .route("/send", post(|| async { (StatusCode::BAD_REQUEST, "bad sender") }));
        let url = spawn_relay(router).await;
        let transport = HttpRelayTransport::new(url, Duration::from_secs(5)).unwrap();
        let err = transport.send(&message(), &credentials()).await.unwrap_err();
        assert!(!err.is_retryable());

        let router = Router::new().route(
            "/send",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let url = spawn_relay(router).await;
        let transport = HttpRelayTransport::new(url, Duration::from_secs(5)).unwrap();
        let err = transport.send(&message(), &credentials()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
