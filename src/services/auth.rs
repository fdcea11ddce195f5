use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::{UserProfile, VerificationStatus};
use crate::services::jwt::{AuthenticatedUser, JwtManager};
use crate::utils::crypto::PasswordManager;
use crate::utils::validation::Validator;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    jwt_manager: JwtManager,
    database: Arc<SqliteDatabase>,
}

impl AuthService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        let jwt_secret = std::env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set in environment for production!");

        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            database,
        }
    }

    /// Test constructor with an explicit secret instead of the environment.
    #[cfg(test)]
    pub fn with_secret(database: Arc<SqliteDatabase>, secret: &str) -> Self {
        Self {
            jwt_manager: JwtManager::new(secret.to_string()),
            database,
        }
    }

    /// Create a profile for a new account: status `new`, admin only when the
    /// operator allow-list says so. No user-facing path ever sets `is_admin`.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Uuid> {
        Validator::validate_email(email)?;
        Validator::validate_password(password)?;
        Validator::validate_display_name(display_name)?;

        if self.database.get_user_by_email(email).await?.is_some() {
            return Err(AppError::AuthenticationError(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = PasswordManager::hash_password(password)?;
        let now = Utc::now();
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.trim().to_string(),
            password_hash,
            photo_url: None,
            is_admin: admin_emails().iter().any(|e| e == email),
            verification_status: VerificationStatus::New,
            id_image_url: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            last_submitted_at: None,
            verified_at: None,
            rejected_at: None,
        };
        self.database.create_user(&user).await?;
        Ok(user.id)
    }

    pub async fn authenticate_user(&self, email: &str, password: &str) -> Result<UserProfile> {
        let user = self
            .database
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| {
                AppError::AuthenticationError("No account found with this email".to_string())
            })?;

        if !PasswordManager::verify_password(password, &user.password_hash)? {
            return Err(AppError::AuthenticationError(
                "Incorrect password".to_string(),
            ));
        }

        Ok(user)
    }

    pub async fn login_and_generate_token(&self, email: &str, password: &str) -> Result<String> {
        let user = self.authenticate_user(email, password).await?;
        self.issue_token(&user).await
    }

    async fn issue_token(&self, user: &UserProfile) -> Result<String> {
        let token = self
            .jwt_manager
            .generate_token(&user.id, &user.email, &user.display_name)?;

        // Extract the token ID for storage, keep only a hash of the token.
        let token_data = self.jwt_manager.validate_token(&token)?;
        let token_id = &token_data.claims.jti;
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + Duration::hours(24);

        self.database
            .store_user_token(&user.id, token_id, &token_hash, expires_at)
            .await?;
        let _ = self.database.cleanup_expired_tokens().await;

        Ok(token)
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        // Signature and expiry first, then the revocation table.
        let token_data = self.jwt_manager.validate_token(token)?;
        let token_id = &token_data.claims.jti;

        if !self.database.is_token_valid(token_id).await? {
            return Err(AppError::AuthenticationError(
                "Token not found or inactive".to_string(),
            ));
        }

        AuthenticatedUser::try_from(token_data.claims)
    }

    /// Validate the token and resolve the full profile record behind it.
    pub async fn current_profile(&self, token: &str) -> Result<UserProfile> {
        let user = self.validate_token(token).await?;
        self.database.get_user_by_id(&user.user_id).await
    }

    pub async fn refresh_token(&self, old_token: &str) -> Result<String> {
        let user = self.validate_token(old_token).await?;
        let profile = self.database.get_user_by_id(&user.user_id).await?;

        self.database.revoke_token(&user.token_id).await?;
        self.issue_token(&profile).await
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let token_data = self.jwt_manager.validate_token(token)?;
        self.database.revoke_token(&token_data.claims.jti).await?;
        Ok(())
    }

    pub async fn logout_all_devices(&self, token: &str) -> Result<()> {
        let user = self.validate_token(token).await?;
        self.database.revoke_all_user_tokens(&user.user_id).await?;
        Ok(())
    }

    pub async fn get_user_sessions_count(&self, token: &str) -> Result<i64> {
        let user = self.validate_token(token).await?;
        self.database.get_user_active_tokens_count(&user.user_id).await
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn admin_emails() -> Vec<String> {
    std::env::var("ADMIN_EMAILS")
        .map(|raw| {
            raw.split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AuthService {
        let db = Arc::new(SqliteDatabase::open_in_memory().await.unwrap());
        AuthService::with_secret(db, "test-secret")
    }

    #[tokio::test]
    async fn register_creates_new_profile() {
        let auth = service().await;
        let user_id = auth.register_user("a@x.com", "secret12", "A").await.unwrap();

        let profile = auth.database.get_user_by_id(&user_id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::New);
        assert!(!profile.is_admin);
        assert_ne!(profile.password_hash, "secret12");
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let auth = service().await;
        auth.register_user("a@x.com", "secret12", "A").await.unwrap();
        let err = auth.register_user("a@x.com", "secret34", "B").await.unwrap_err();
        assert!(matches!(err, AppError::AuthenticationError(_)));
    }

    #[tokio::test]
    async fn login_issues_validatable_token() {
        let auth = service().await;
        let user_id = auth.register_user("a@x.com", "secret12", "A").await.unwrap();

        let token = auth
            .login_and_generate_token("a@x.com", "secret12")
            .await
            .unwrap();
        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_account_fail_differently() {
        let auth = service().await;
        auth.register_user("a@x.com", "secret12", "A").await.unwrap();

        let wrong = auth
            .login_and_generate_token("a@x.com", "bad-pass1")
            .await
            .unwrap_err();
        assert!(wrong.to_string().contains("Incorrect password"));

        let unknown = auth
            .login_and_generate_token("b@x.com", "secret12")
            .await
            .unwrap_err();
        assert!(unknown.to_string().contains("No account found"));
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let auth = service().await;
        auth.register_user("a@x.com", "secret12", "A").await.unwrap();
        let token = auth
            .login_and_generate_token("a@x.com", "secret12")
            .await
            .unwrap();

        auth.logout(&token).await.unwrap();
        assert!(auth.validate_token(&token).await.is_err());
    }
}
