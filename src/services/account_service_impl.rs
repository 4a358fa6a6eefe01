//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::Duration;
use sea_orm::{IntoActiveModel, Set};
use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, hash_password};
use crate::domain::{Principal, Role};
use crate::entities::user_tokens::TokenPurpose;
use crate::entities::users;
use crate::services::account_service::{
    AccountError, AccountService, ForgotPasswordRequest, InviteRequest, Invited, LoginRequest,
    PasswordTokenRequest, RegisterRequest, UserUpdate, UserView,
};
use crate::services::notify::PlatformNotifier;

const INVALID_TOKEN: &str = "Invalid or expired token";

pub struct SeaOrmAccountService {
    store: Store,
    security: SecurityConfig,
    notifier: Arc<PlatformNotifier>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, notifier: Arc<PlatformNotifier>) -> Self {
        Self {
            store,
            security,
            notifier,
        }
    }

    fn check_new_password(&self, password: &str, confirm: &str) -> Result<(), AccountError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(AccountError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        if password != confirm {
            return Err(AccountError::Validation("Passwords do not match".to_string()));
        }
        Ok(())
    }

    fn require_admin(principal: &Principal) -> Result<i32, AccountError> {
        match (principal.role, principal.organization_id) {
            (Role::Admin, Some(org_id)) => Ok(org_id),
            (Role::Admin, None) | (Role::Developer, _) => Err(AccountError::Forbidden(
                "Only organization admins can manage users".to_string(),
            )),
        }
    }

    /// A member of the admin's organization other than the admin.
    async fn managed_user(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<users::Model, AccountError> {
        let org_id = Self::require_admin(principal)?;
        if principal.user_id == id {
            return Err(AccountError::Forbidden(
                "You cannot manage your own account here".to_string(),
            ));
        }

        self.store
            .user_repo()
            .get_by_id(id)
            .await?
            .filter(|u| u.organization_id == Some(org_id))
            .ok_or(AccountError::NotFound)
    }

    /// Consumes a token of `purpose` and stores the new password.
    async fn redeem(
        &self,
        request: PasswordTokenRequest,
        purpose: TokenPurpose,
    ) -> Result<users::Model, AccountError> {
        self.check_new_password(&request.password, &request.password_confirm)?;

        let tokens = self.store.user_token_repo();
        let token = tokens
            .find_valid(request.token.trim(), purpose)
            .await?
            .ok_or_else(|| AccountError::Validation(INVALID_TOKEN.to_string()))?;

        let users = self.store.user_repo();
        let activate = purpose == TokenPurpose::Invite;
        let usable = users
            .get_by_id(token.user_id)
            .await?
            .is_some_and(|u| activate || u.is_active);
        if !usable || !tokens.consume(token.id).await? {
            return Err(AccountError::Validation(INVALID_TOKEN.to_string()));
        }

        let user = users
            .set_password(token.user_id, &request.password, &self.security, activate)
            .await?;

        info!(event = "password_set", user_id = user.id, purpose = ?purpose, "Password updated");
        Ok(user)
    }
}

fn looks_like_email(value: &str) -> bool {
    value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, request: RegisterRequest) -> Result<UserView, AccountError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AccountError::Validation("Username is required".to_string()));
        }
        if !looks_like_email(&email) {
            return Err(AccountError::Validation("A valid email is required".to_string()));
        }
        self.check_new_password(&request.password, &request.password_confirm)?;

        let organization_name = request
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&username)
            .to_string();

        if self
            .store
            .organization_repo()
            .find_by_name(&organization_name)
            .await?
            .is_some()
        {
            return Err(AccountError::Conflict(format!(
                "Organization \"{organization_name}\" already exists; ask its admin for an invitation"
            )));
        }

        if self
            .store
            .user_repo()
            .username_or_email_taken(&username, &email)
            .await?
        {
            return Err(AccountError::Conflict(
                "A user with this username or email already exists".to_string(),
            ));
        }

        let password = request.password.clone();
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| AccountError::Internal(format!("Password hashing task failed: {e}")))??;

        let (organization, user) = self
            .store
            .user_repo()
            .create_with_organization(
                &organization_name,
                NewUser {
                    username,
                    email,
                    password_hash: Some(password_hash),
                    role: Role::Admin,
                    is_active: true,
                    ..Default::default()
                },
            )
            .await?;

        info!(
            event = "user_registered",
            user_id = user.id,
            organization_id = organization.id,
            "Registered new organization admin"
        );

        Ok(user.into())
    }

    async fn login(&self, request: LoginRequest) -> Result<UserView, AccountError> {
        let user = self
            .store
            .user_repo()
            .verify_password(request.username.trim(), &request.password)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AccountError::Unauthenticated("Invalid credentials".to_string()))?;

        Ok(user.into())
    }

    async fn current_user(&self, user_id: i32) -> Result<UserView, AccountError> {
        self.store
            .user_repo()
            .get_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .map(UserView::from)
            .ok_or_else(|| AccountError::Unauthenticated("Not authenticated".to_string()))
    }

    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserView>, AccountError> {
        let org_id = Self::require_admin(principal)?;
        let members = self
            .store
            .user_repo()
            .list_in_organization(org_id, Some(principal.user_id))
            .await?;
        Ok(members.into_iter().map(UserView::from).collect())
    }

    async fn invite_user(
        &self,
        principal: &Principal,
        request: InviteRequest,
    ) -> Result<Invited, AccountError> {
        let org_id = Self::require_admin(principal)?;

        let email = request.email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(AccountError::Validation("A valid email is required".to_string()));
        }
        if self.store.user_repo().get_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let user = self
            .store
            .user_repo()
            .create(NewUser {
                username: email.clone(),
                email,
                password_hash: None,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: request.phone.trim().to_string(),
                role: request.role,
                organization_id: Some(org_id),
                is_active: false,
            })
            .await?;

        let token = self
            .store
            .user_token_repo()
            .issue(
                user.id,
                TokenPurpose::Invite,
                Duration::hours(self.security.invite_token_ttl_hours),
            )
            .await?;

        info!(
            event = "user_invited",
            user_id = user.id,
            invited_by = principal.user_id,
            role = %user.role,
            "User invited"
        );

        let mut warnings = Vec::new();
        if let Err(e) = self.notifier.send_invite(&user, &token.token).await {
            warn!(event = "invite_mail_failed", user_id = user.id, error = %e, "Invitation email not sent");
            warnings.push(format!("Invitation email could not be sent: {e}"));
        }

        Ok(Invited {
            user: user.into(),
            warnings,
        })
    }

    async fn update_user(
        &self,
        principal: &Principal,
        id: i32,
        update: UserUpdate,
    ) -> Result<UserView, AccountError> {
        let user = self.managed_user(principal, id).await?;

        let mut active = user.into_active_model();
        if let Some(first_name) = update.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = update.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(phone) = update.phone {
            active.phone = Set(phone.trim().to_string());
        }
        if let Some(role) = update.role {
            active.role = Set(role);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        let user = self.store.user_repo().update(active).await?;
        if update.is_active == Some(false) {
            let revoked = self.store.user_token_repo().revoke_all(user.id).await?;
            info!(
                event = "user_deactivated",
                user_id = user.id,
                deactivated_by = principal.user_id,
                revoked_tokens = revoked,
                "User deactivated"
            );
        }

        Ok(user.into())
    }

    async fn delete_user(&self, principal: &Principal, id: i32) -> Result<(), AccountError> {
        let user = self.managed_user(principal, id).await?;
        self.store.user_repo().delete(user.id).await?;
        info!(event = "user_deleted", user_id = id, deleted_by = principal.user_id, "User deleted");
        Ok(())
    }

    async fn set_password(&self, request: PasswordTokenRequest) -> Result<UserView, AccountError> {
        Ok(self.redeem(request, TokenPurpose::Invite).await?.into())
    }

    async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<(), AccountError> {
        let Some(user) = self
            .store
            .user_repo()
            .get_by_email(request.email.trim())
            .await?
            .filter(|u| u.is_active)
        else {
            return Ok(());
        };

        let token = self
            .store
            .user_token_repo()
            .issue(
                user.id,
                TokenPurpose::PasswordReset,
                Duration::hours(self.security.reset_token_ttl_hours),
            )
            .await?;

        if let Err(e) = self.notifier.send_password_reset(&user, &token.token).await {
            warn!(event = "reset_mail_failed", user_id = user.id, error = %e, "Password reset email not sent");
        }

        Ok(())
    }

    async fn reset_password(&self, request: PasswordTokenRequest) -> Result<(), AccountError> {
        self.redeem(request, TokenPurpose::PasswordReset).await?;
        Ok(())
    }
}
