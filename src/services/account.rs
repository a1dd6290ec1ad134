//! Account service
//!
//! Admin accounts, password login and session tokens. Sessions are opaque
//! UUID tokens stored in the database with an expiry.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Account, CreateAccountInput, EventType, NewActivity, Session};
use crate::services::password::{hash_password, validate_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::ActivityLogService;
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{2,32}$").expect("valid regex"));

/// Default session lifetime
const DEFAULT_SESSION_DAYS: i64 = 7;

/// Error types for account service operations
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Too many login attempts, try again later")]
    TooManyRequests,

    #[error("Account not found: {0}")]
    NotFound(i64),

    #[error("Account already exists: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Password change request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

pub struct AccountService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    activity: Arc<ActivityLogService>,
    rate_limiter: LoginRateLimiter,
    session_duration: Duration,
}

impl AccountService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        activity: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            activity,
            rate_limiter: LoginRateLimiter::new(),
            session_duration: Duration::days(DEFAULT_SESSION_DAYS),
        }
    }

    pub fn with_session_days(mut self, days: i64) -> Self {
        self.session_duration = Duration::days(days.max(1));
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: LoginRateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Create the first account when there is none. Returns whether one was created.
    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<bool, AccountServiceError> {
        let count = self.user_repo.count().await.context("Failed to count accounts")?;
        if count > 0 {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        self.user_repo
            .create(&Account::new(username, hash))
            .await
            .context("Failed to seed admin account")?;
        tracing::info!("Created initial account '{}'", username);
        Ok(true)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Check credentials and open a session
    pub async fn login(
        &self,
        input: LoginInput,
        client_ip: Option<IpAddr>,
        user_agent: Option<&str>,
    ) -> Result<(Session, Account), AccountServiceError> {
        if let Some(ip) = client_ip {
            if self.rate_limiter.is_ip_limited(ip).await {
                return Err(AccountServiceError::TooManyRequests);
            }
            self.rate_limiter.record_ip_request(ip).await;
        }

        let username = input.username.trim();
        if self.rate_limiter.is_username_limited(username).await {
            tracing::warn!("Login for '{}' rejected by rate limiter", username);
            return Err(AccountServiceError::TooManyRequests);
        }

        let invalid = || AccountServiceError::AuthenticationError("Invalid username or password".to_string());

        let account = match self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get account")?
        {
            Some(account) => account,
            None => {
                self.rate_limiter.record_failed_attempt(username).await;
                return Err(invalid());
            }
        };

        if !verify_password(&input.password, &account.password_hash)? {
            self.rate_limiter.record_failed_attempt(username).await;
            let ip = client_ip.map(|ip| ip.to_string());
            self.activity
                .record(
                    NewActivity::new(EventType::Account, "Failed login")
                        .target(&account.username)
                        .client(ip.as_deref(), user_agent),
                )
                .await;
            return Err(invalid());
        }
        self.rate_limiter.clear_username_attempts(username).await;

        let now = Utc::now();
        let session = self
            .session_repo
            .create(&Session {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: account.id,
                expires_at: now + self.session_duration,
                created_at: now,
            })
            .await
            .context("Failed to create session")?;

        let ip = client_ip.map(|ip| ip.to_string());
        self.user_repo
            .record_login(account.id, ip.as_deref(), now)
            .await
            .context("Failed to record login")?;
        self.activity
            .record(
                NewActivity::new(EventType::Account, "Logged in")
                    .actor(Some(&account.username))
                    .client(ip.as_deref(), user_agent),
            )
            .await;

        let account = Account {
            last_login_ip: ip,
            last_login_time: Some(now),
            ..account
        };
        Ok((session, account))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Account behind a live session token. Expired sessions are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<Account>, AccountServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        Ok(self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get account")?)
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AccountServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        self.rate_limiter.cleanup().await;
        Ok(removed)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn list(&self) -> Result<Vec<Account>, AccountServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list accounts")?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Account, AccountServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get account")?
            .ok_or(AccountServiceError::NotFound(id))
    }

    pub async fn create(&self, input: CreateAccountInput, actor: &Account) -> Result<Account, AccountServiceError> {
        let username = input.username.trim();
        if !USERNAME_RE.is_match(username) {
            return Err(AccountServiceError::ValidationError(
                "Username must be 2-32 letters, digits or underscores".to_string(),
            ));
        }
        validate_password(&input.password).map_err(AccountServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(AccountServiceError::Conflict(username.to_string()));
        }

        let hash = hash_password(&input.password)?;
        let created = self
            .user_repo
            .create(&Account::new(username, hash))
            .await
            .context("Failed to create account")?;

        self.activity
            .record(
                NewActivity::new(EventType::Account, "Created account")
                    .actor(Some(&actor.username))
                    .target(&created.username),
            )
            .await;
        Ok(created)
    }

    /// Delete an account and its sessions. The acting account and the last
    /// remaining account cannot be deleted.
    pub async fn delete(&self, id: i64, actor: &Account) -> Result<(), AccountServiceError> {
        if id == actor.id {
            return Err(AccountServiceError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }
        let account = self.get_by_id(id).await?;
        let count = self.user_repo.count().await.context("Failed to count accounts")?;
        if count <= 1 {
            return Err(AccountServiceError::Forbidden(
                "The last account cannot be deleted".to_string(),
            ));
        }

        self.session_repo
            .delete_by_user(id)
            .await
            .context("Failed to delete sessions")?;
        self.user_repo.delete(id).await.context("Failed to delete account")?;

        self.activity
            .record(
                NewActivity::new(EventType::Account, "Deleted account")
                    .actor(Some(&actor.username))
                    .target(&account.username),
            )
            .await;
        Ok(())
    }

    pub async fn change_password(&self, id: i64, input: ChangePasswordInput) -> Result<(), AccountServiceError> {
        let account = self.get_by_id(id).await?;
        if !verify_password(&input.old_password, &account.password_hash)? {
            return Err(AccountServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(&input.new_password).map_err(AccountServiceError::ValidationError)?;

        let hash = hash_password(&input.new_password)?;
        self.user_repo
            .update_password(id, &hash)
            .await
            .context("Failed to update password")?;

        self.activity
            .record(NewActivity::new(EventType::Account, "Changed password").actor(Some(&account.username)))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    async fn setup() -> (TestContext, AccountService) {
        let ctx = TestContext::new().await;
        let service = ctx.account_service();
        service.seed_admin("admin", "admin123").await.unwrap();
        (ctx, service)
    }

    #[tokio::test]
    async fn test_seed_admin_only_once() {
        let (_ctx, service) = setup().await;
        assert!(!service.seed_admin("other", "password1").await.unwrap());
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let (_ctx, service) = setup().await;
        let ip: IpAddr = "203.0.113.5".parse().unwrap();

        let (session, account) = service
            .login(LoginInput::new("Admin", "admin123"), Some(ip), Some("test-agent"))
            .await
            .unwrap();
        assert_eq!(account.username, "admin");
        assert_eq!(account.last_login_ip.as_deref(), Some("203.0.113.5"));

        let validated = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(validated.id, account.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_rate_limit() {
        let (_ctx, service) = setup().await;

        for _ in 0..5 {
            assert!(matches!(
                service.login(LoginInput::new("admin", "wrong"), None, None).await,
                Err(AccountServiceError::AuthenticationError(_))
            ));
        }
        assert!(matches!(
            service.login(LoginInput::new("admin", "admin123"), None, None).await,
            Err(AccountServiceError::TooManyRequests)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let (ctx, service) = setup().await;
        let admin = service.list().await.unwrap().remove(0);
        let repo = crate::db::repositories::SqlxSessionRepository::new(ctx.pool.clone());
        let expired = Session {
            id: "expired-token".to_string(),
            user_id: admin.id,
            expires_at: Utc::now() - Duration::hours(1),
            created_at: Utc::now() - Duration::days(8),
        };
        repo.create(&expired).await.unwrap();

        assert!(service.validate_session("expired-token").await.unwrap().is_none());
        assert!(repo.get_by_id("expired-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_delete_rules() {
        let (_ctx, service) = setup().await;
        let admin = service.list().await.unwrap().remove(0);

        assert!(matches!(
            service
                .create(CreateAccountInput { username: "x".into(), password: "password1".into() }, &admin)
                .await,
            Err(AccountServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .create(CreateAccountInput { username: "editor".into(), password: "short".into() }, &admin)
                .await,
            Err(AccountServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .create(CreateAccountInput { username: "ADMIN".into(), password: "password1".into() }, &admin)
                .await,
            Err(AccountServiceError::Conflict(_))
        ));

        let editor = service
            .create(CreateAccountInput { username: "editor".into(), password: "password1".into() }, &admin)
            .await
            .unwrap();

        assert!(matches!(
            service.delete(admin.id, &admin).await,
            Err(AccountServiceError::Forbidden(_))
        ));
        service.delete(editor.id, &admin).await.unwrap();
        assert!(matches!(
            service.delete(admin.id, &editor).await,
            Err(AccountServiceError::NotFound(_)) | Err(AccountServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (_ctx, service) = setup().await;
        let admin = service.list().await.unwrap().remove(0);

        assert!(matches!(
            service
                .change_password(
                    admin.id,
                    ChangePasswordInput { old_password: "nope".into(), new_password: "newpass123".into() }
                )
                .await,
            Err(AccountServiceError::AuthenticationError(_))
        ));
        service
            .change_password(
                admin.id,
                ChangePasswordInput { old_password: "admin123".into(), new_password: "newpass123".into() },
            )
            .await
            .unwrap();
        assert!(service
            .login(LoginInput::new("admin", "newpass123"), None, None)
            .await
            .is_ok());
    }
}
