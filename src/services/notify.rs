//! Account notifications sent with the platform mailer.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::Store;
use crate::entities::users;
use crate::services::crypto::{CipherError, CredentialCipher};
use crate::services::transport::{
    EmailTransport, OutgoingEmail, ProviderCredentials, TransportError,
};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Platform mailer is not configured")]
    NotConfigured,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for NotifyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

pub struct PlatformNotifier {
    store: Store,
    cipher: CredentialCipher,
    transport: Arc<dyn EmailTransport>,
    public_url: String,
}

impl PlatformNotifier {
    #[must_use]
    pub fn new(
        store: Store,
        cipher: CredentialCipher,
        transport: Arc<dyn EmailTransport>,
        public_url: &str,
    ) -> Self {
        Self {
            store,
            cipher,
            transport,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_invite(&self, user: &users::Model, token: &str) -> Result<(), NotifyError> {
        let link = format!("{}/set-password?token={token}", self.public_url);
        let html = invite_html(user, &link);
        self.send(&user.email, "You have been invited to Xyno", html)
            .await
    }

    pub async fn send_password_reset(
        &self,
        user: &users::Model,
        token: &str,
    ) -> Result<(), NotifyError> {
        let link = format!("{}/reset-password?token={token}", self.public_url);
        let html = reset_html(user, &link);
        self.send(&user.email, "Reset your Xyno password", html)
            .await
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), NotifyError> {
        let mailer = self
            .store
            .platform_repo()
            .get()
            .await?
            .filter(|m| m.is_active)
            .ok_or(NotifyError::NotConfigured)?;

        let credentials = ProviderCredentials {
            access_key_id: self.cipher.decrypt(&mailer.access_key_encrypted)?,
            secret_access_key: self.cipher.decrypt(&mailer.secret_key_encrypted)?,
            region: mailer.region,
        };

        let email = OutgoingEmail {
            from: mailer.sender_email,
            to: to.to_string(),
            subject: subject.to_string(),
            html,
        };

        let message_id = self.transport.send(&email, &credentials).await?;
        info!(event = "notification_sent", to = %to, message_id = %message_id, "Account notification sent");
        Ok(())
    }
}

fn invite_html(user: &users::Model, link: &str) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>You have been invited to Xyno. Choose a password to activate your account:</p>\
         <p><a href=\"{href}\">{text}</a></p>",
        name = html_escape::encode_text(display_name(user)),
        href = html_escape::encode_double_quoted_attribute(link),
        text = html_escape::encode_text(link),
    )
}

fn reset_html(user: &users::Model, link: &str) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>Use the link below to reset your Xyno password. It expires soon and works once.</p>\
         <p><a href=\"{href}\">{text}</a></p>",
        name = html_escape::encode_text(display_name(user)),
        href = html_escape::encode_double_quoted_attribute(link),
        text = html_escape::encode_text(link),
    )
}

fn display_name(user: &users::Model) -> &str {
    if user.first_name.is_empty() {
        &user.username
    } else {
        &user.first_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn user(first_name: &str) -> users::Model {
        users::Model {
            id: 1,
            username: "mallory@acme.test".to_string(),
            email: "mallory@acme.test".to_string(),
            password_hash: None,
            first_name: first_name.to_string(),
            last_name: String::new(),
            phone: String::new(),
            role: Role::Developer,
            organization_id: Some(1),
            is_active: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_invite_escapes_user_supplied_name() {
        let html = invite_html(
            &user("<img src=x onerror=alert(1)>"),
            "https://app.test/set-password?token=abc",
        );

        assert!(!html.contains("<img"));
        assert!(html.contains("Hi &lt;img src=x onerror=alert(1)&gt;,"));
        assert!(html.contains("href=\"https://app.test/set-password?token=abc\""));
    }

    #[test]
    fn test_reset_falls_back_to_username_and_escapes_it() {
        let mut model = user("");
        model.username = "a&b".to_string();

        let html = reset_html(&model, "https://app.test/reset-password?token=t");
        assert!(html.starts_with("<p>Hi a&amp;b,</p>"));
    }
}
