use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::{Role, User};
use crate::services::jwt::JwtManager;
use crate::utils::crypto::PasswordManager;

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Admin session authentication against the local user store.
pub struct AdminAuthService {
    database: Arc<SqliteDatabase>,
    jwt_manager: Arc<JwtManager>,
    token_ttl: Duration,
}

impl AdminAuthService {
    pub fn new(
        database: Arc<SqliteDatabase>,
        jwt_manager: Arc<JwtManager>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            database,
            jwt_manager,
            token_ttl,
        }
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let user = self
            .database
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::AuthenticationFailure("Invalid credentials".to_string()))?;

        if !user.enabled {
            warn!(action = "admin_login_disabled_account", user = %username);
            return Err(AppError::AuthenticationFailure(
                "Account is disabled".to_string(),
            ));
        }
        if user.role != Role::Admin {
            warn!(action = "admin_login_wrong_role", user = %username, role = %user.role);
            return Err(AppError::AuthenticationFailure(
                "Invalid credentials".to_string(),
            ));
        }

        let hash = user.password_hash.as_deref().ok_or_else(|| {
            AppError::AuthenticationFailure("Account has no password set".to_string())
        })?;
        if !PasswordManager::verify_password(password, hash)? {
            warn!(action = "admin_login_bad_password", user = %username);
            return Err(AppError::AuthenticationFailure(
                "Invalid credentials".to_string(),
            ));
        }

        let token =
            self.jwt_manager
                .issue(user.user_id, user.role, &user.username, self.token_ttl)?;

        info!(action = "admin_login_success", user = %username, user_id = user.user_id);
        Ok(LoginOutcome { token, user })
    }

    pub fn validate_token(&self, token: &str) -> bool {
        match self.jwt_manager.decode(token) {
            Ok(claims) => self.jwt_manager.is_live(&claims),
            Err(_) => false,
        }
    }
}

/// Creates the configured admin account when it does not exist yet, so the
/// service is usable before any provisioning has run.
pub async fn ensure_admin_user(
    database: &SqliteDatabase,
    username: &str,
    password: &str,
) -> Result<()> {
    if database.get_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    let hash = PasswordManager::hash_password(password)?;
    let user_id = database
        .create_user(username, Role::Admin, Some(&hash))
        .await?;
    info!(action = "admin_user_seeded", user = %username, user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> (Arc<SqliteDatabase>, AdminAuthService) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        ensure_admin_user(&db, "admin", "admin123").await.unwrap();
        let jwt = Arc::new(JwtManager::new("test-secret".to_string()));
        let svc = AdminAuthService::new(db.clone(), jwt, Duration::hours(24));
        (db, svc)
    }

    #[tokio::test]
    async fn login_with_valid_credentials_issues_token() {
        let (_db, svc) = service().await;
        let outcome = svc.authenticate("admin", "admin123").await.unwrap();
        assert_eq!(outcome.user.role, Role::Admin);
        assert!(svc.validate_token(&outcome.token));
    }

    #[tokio::test]
    async fn login_with_bad_password_fails() {
        let (_db, svc) = service().await;
        let err = svc.authenticate("admin", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure(_)));
    }

    #[tokio::test]
    async fn customer_accounts_cannot_use_admin_login() {
        let (db, svc) = service().await;
        db.create_user("customer_1", Role::Customer, None)
            .await
            .unwrap();
        let err = svc.authenticate("customer_1", "anything").await.unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure(_)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (db, _svc) = service().await;
        ensure_admin_user(&db, "admin", "admin123").await.unwrap();
        assert!(db.get_user_by_username("admin").await.unwrap().is_some());
    }
}
