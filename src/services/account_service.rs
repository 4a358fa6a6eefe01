//! Domain service for accounts: registration, login, invitations, password
//! management and the organization's user directory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::is_unique_violation;
use crate::domain::{Principal, Role};
use crate::entities::users;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("User not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

const TAKEN_MESSAGE: &str = "A user with this username or email already exists";

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(TAKEN_MESSAGE.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db) if is_unique_violation(db) => Self::Conflict(TAKEN_MESSAGE.to_string()),
            _ => Self::Internal(format!("{err:#}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// Organization to create; defaults to the username.
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Used by both set-password (invitations) and reset-password.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordTokenRequest {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub organization_id: Option<i32>,
    pub is_active: bool,
    /// `invited` until a password has been set, then `active` or `inactive`.
    pub status: &'static str,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for UserView {
    fn from(u: users::Model) -> Self {
        Self {
            status: match (&u.password_hash, u.is_active) {
                (None, _) => "invited",
                (Some(_), true) => "active",
                (Some(_), false) => "inactive",
            },
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            role: u.role,
            organization_id: u.organization_id,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// An invited user plus any notification problems.
#[derive(Debug, Clone, Serialize)]
pub struct Invited {
    pub user: UserView,
    pub warnings: Vec<String>,
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Registers a user together with a new organization; the registrant
    /// becomes its admin.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Conflict`] if the username, email or
    /// organization name is already taken.
    async fn register(&self, request: RegisterRequest) -> Result<UserView, AccountError>;

    /// Verifies credentials of an active user.
    async fn login(&self, request: LoginRequest) -> Result<UserView, AccountError>;

    /// Loads the active user behind a session.
    async fn current_user(&self, user_id: i32) -> Result<UserView, AccountError>;

    /// Members of the caller's organization, excluding the caller. Admin only.
    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserView>, AccountError>;

    /// Creates an inactive member and mails a set-password link. Mail
    /// failures are reported as warnings, never as errors.
    async fn invite_user(
        &self,
        principal: &Principal,
        request: InviteRequest,
    ) -> Result<Invited, AccountError>;

    async fn update_user(
        &self,
        principal: &Principal,
        id: i32,
        update: UserUpdate,
    ) -> Result<UserView, AccountError>;

    async fn delete_user(&self, principal: &Principal, id: i32) -> Result<(), AccountError>;

    /// Completes an invitation: sets the password and activates the user.
    async fn set_password(&self, request: PasswordTokenRequest) -> Result<UserView, AccountError>;

    /// Issues a reset token for an active user. Succeeds whether or not the
    /// address is known.
    async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<(), AccountError>;

    async fn reset_password(&self, request: PasswordTokenRequest) -> Result<(), AccountError>;
}
