use crate::errors::{AppError, Result};
use crate::models::user::{UserProfile, VerificationStatus};
use crate::models::verification::{RequestStatus, ReviewDecision, VerificationRequest};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }

        // Create the database file if it doesn't exist
        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database file: {}", e))
            })?;
            println!("📁 Created new database file: {}", database_path);
        }
        let database_url = format!("sqlite:{}", database_path);

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        println!("✅ Connected to SQLite database: {}", database_path);
        Ok(db)
    }

    /// In-memory database, one connection so every query sees the same
    /// store. Used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory database: {}", e)))?;
        let db = Self { pool };
        db.create_tables().await?;
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                display_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                photo_url TEXT,
                is_admin BOOLEAN DEFAULT FALSE,
                verification_status TEXT NOT NULL DEFAULT 'new',
                id_image_url TEXT,
                rejection_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_submitted_at TEXT,
                verified_at TEXT,
                rejected_at TEXT
            );

            CREATE TABLE IF NOT EXISTS user_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                token_id TEXT UNIQUE NOT NULL,
                token_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                is_active BOOLEAN DEFAULT TRUE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS verification_requests (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_email TEXT NOT NULL,
                user_name TEXT NOT NULL,
                id_image_url TEXT NOT NULL,
                file_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                admin_comment TEXT,
                submitted_at TEXT NOT NULL,
                processed_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_tokens_user_id ON user_tokens(user_id);
            CREATE INDEX IF NOT EXISTS idx_tokens_token_id ON user_tokens(token_id);
            CREATE INDEX IF NOT EXISTS idx_tokens_active ON user_tokens(is_active);
            CREATE INDEX IF NOT EXISTS idx_requests_user_id ON verification_requests(user_id);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON verification_requests(status);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    // ---- users ----

    pub async fn create_user(&self, user: &UserProfile) -> Result<()> {
        let query = r#"
            INSERT INTO users (id, email, display_name, password_hash, photo_url, is_admin,
                               verification_status, id_image_url, rejection_reason,
                               created_at, updated_at, last_submitted_at, verified_at, rejected_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#;
        sqlx::query(query)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(&user.photo_url)
            .bind(user.is_admin)
            .bind(user.verification_status.as_str())
            .bind(&user.id_image_url)
            .bind(&user.rejection_reason)
            .bind(user.created_at.to_rfc3339())
            .bind(user.updated_at.to_rfc3339())
            .bind(user.last_submitted_at.map(|dt| dt.to_rfc3339()))
            .bind(user.verified_at.map(|dt| dt.to_rfc3339()))
            .bind(user.rejected_at.map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {}", e)))?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?;
        row.map(map_user_row).transpose()
    }

    pub async fn get_user_by_id(&self, user_id: &Uuid) -> Result<UserProfile> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?;
        match row {
            Some(row) => map_user_row(row),
            None => Err(AppError::NotFound(format!("No user with id {}", user_id))),
        }
    }

    // ---- session tokens ----

    pub async fn store_user_token(
        &self,
        user_id: &Uuid,
        token_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO user_tokens (user_id, token_id, token_hash, created_at, expires_at, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, TRUE)
        "#;
        sqlx::query(query)
            .bind(user_id.to_string())
            .bind(token_id)
            .bind(token_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store token: {}", e)))?;
        Ok(())
    }

    pub async fn is_token_valid(&self, token_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM user_tokens WHERE token_id = ?1 AND is_active = TRUE AND expires_at > ?2",
        )
        .bind(token_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check token: {}", e)))?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    pub async fn revoke_token(&self, token_id: &str) -> Result<()> {
        sqlx::query("UPDATE user_tokens SET is_active = FALSE WHERE token_id = ?1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to revoke token: {}", e)))?;
        Ok(())
    }

    pub async fn revoke_all_user_tokens(&self, user_id: &Uuid) -> Result<()> {
        sqlx::query("UPDATE user_tokens SET is_active = FALSE WHERE user_id = ?1")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to revoke tokens: {}", e)))?;
        Ok(())
    }

    pub async fn cleanup_expired_tokens(&self) -> Result<()> {
        sqlx::query("DELETE FROM user_tokens WHERE expires_at <= ?1")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clean up tokens: {}", e)))?;
        Ok(())
    }

    pub async fn get_user_active_tokens_count(&self, user_id: &Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM user_tokens WHERE user_id = ?1 AND is_active = TRUE AND expires_at > ?2",
        )
        .bind(user_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count tokens: {}", e)))?;
        Ok(row.get::<i64, _>("count"))
    }

    // ---- verification ----

    /// Record a submission: create the request and move the profile to
    /// `pending` in one transaction. The profile update is conditional on
    /// the status still being submittable, which is the machine's guard
    /// applied at the store.
    pub async fn record_submission(&self, request: &VerificationRequest) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET verification_status = 'pending',
                id_image_url = ?1,
                rejection_reason = NULL,
                last_submitted_at = ?2,
                updated_at = ?2
            WHERE id = ?3 AND verification_status IN ('new', 'rejected')
            "#,
        )
        .bind(&request.id_image_url)
        .bind(now.to_rfc3339())
        .bind(request.user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update profile status: {}", e)))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to roll back: {}", e)))?;
            return Err(AppError::PolicyError(
                "A submission is not allowed in the current verification state".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO verification_requests
                (id, user_id, user_email, user_name, id_image_url, file_name,
                 status, admin_comment, submitted_at, processed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.user_id.to_string())
        .bind(&request.user_email)
        .bind(&request.user_name)
        .bind(&request.id_image_url)
        .bind(&request.file_name)
        .bind(request.status.as_str())
        .bind(&request.admin_comment)
        .bind(request.submitted_at.to_rfc3339())
        .bind(request.processed_at.map(|dt| dt.to_rfc3339()))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create verification request: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit submission: {}", e)))?;
        Ok(())
    }

    pub async fn get_request_by_id(&self, request_id: &Uuid) -> Result<Option<VerificationRequest>> {
        let row = sqlx::query("SELECT * FROM verification_requests WHERE id = ?1")
            .bind(request_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch request: {}", e)))?;
        row.map(map_request_row).transpose()
    }

    pub async fn get_latest_request_for_user(&self, user_id: &Uuid) -> Result<Option<VerificationRequest>> {
        let row = sqlx::query(
            "SELECT * FROM verification_requests WHERE user_id = ?1 ORDER BY submitted_at DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch request: {}", e)))?;
        row.map(map_request_row).transpose()
    }

    /// Pending requests in arrival order.
    pub async fn list_pending_requests(&self) -> Result<Vec<VerificationRequest>> {
        let rows = sqlx::query(
            "SELECT * FROM verification_requests WHERE status = 'pending' ORDER BY submitted_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list pending requests: {}", e)))?;
        rows.into_iter().map(map_request_row).collect()
    }

    /// Apply an administrator's decision: both the request and the profile
    /// move together in one transaction, and only if the request is still
    /// `pending`. A racing second reviewer matches zero rows and gets a
    /// policy error.
    pub async fn apply_review(
        &self,
        request_id: &Uuid,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let row = sqlx::query("SELECT user_id FROM verification_requests WHERE id = ?1")
            .bind(request_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch request: {}", e)))?;
        let user_id: String = match row {
            Some(row) => row.get("user_id"),
            None => {
                return Err(AppError::NotFound(format!(
                    "No verification request with id {}",
                    request_id
                )))
            }
        };

        let now = Utc::now().to_rfc3339();
        let (request_status, profile_status) = match decision {
            ReviewDecision::Approve => (RequestStatus::Approved, VerificationStatus::Verified),
            ReviewDecision::Reject => (RequestStatus::Rejected, VerificationStatus::Rejected),
        };

        let updated = sqlx::query(
            r#"
            UPDATE verification_requests
            SET status = ?1, admin_comment = ?2, processed_at = ?3
            WHERE id = ?4 AND status = 'pending'
            "#,
        )
        .bind(request_status.as_str())
        .bind(reason)
        .bind(&now)
        .bind(request_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update request: {}", e)))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to roll back: {}", e)))?;
            return Err(AppError::PolicyError(
                "This request has already been processed".to_string(),
            ));
        }

        match decision {
            ReviewDecision::Approve => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET verification_status = ?1, verified_at = ?2, updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(profile_status.as_str())
                .bind(&now)
                .bind(&user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to update profile: {}", e)))?;
            }
            ReviewDecision::Reject => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET verification_status = ?1, rejection_reason = ?2, rejected_at = ?3, updated_at = ?3
                    WHERE id = ?4
                    "#,
                )
                .bind(profile_status.as_str())
                .bind(reason)
                .bind(&now)
                .bind(&user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to update profile: {}", e)))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit review: {}", e)))?;
        Ok(())
    }
}

fn map_user_row(row: sqlx::sqlite::SqliteRow) -> Result<UserProfile> {
    let id: String = row.get("id");
    let status: String = row.get("verification_status");
    Ok(UserProfile {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::DatabaseError(format!("Invalid user id in row: {}", e)))?,
        email: row.get("email"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        photo_url: row.get("photo_url"),
        is_admin: row.get("is_admin"),
        verification_status: VerificationStatus::parse(&status)?,
        id_image_url: row.get("id_image_url"),
        rejection_reason: row.get("rejection_reason"),
        created_at: parse_datetime(row.get("created_at"))?,
        updated_at: parse_datetime(row.get("updated_at"))?,
        last_submitted_at: parse_optional_datetime(row.get("last_submitted_at")),
        verified_at: parse_optional_datetime(row.get("verified_at")),
        rejected_at: parse_optional_datetime(row.get("rejected_at")),
    })
}

fn map_request_row(row: sqlx::sqlite::SqliteRow) -> Result<VerificationRequest> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    Ok(VerificationRequest {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::DatabaseError(format!("Invalid request id in row: {}", e)))?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| AppError::DatabaseError(format!("Invalid user id in row: {}", e)))?,
        user_email: row.get("user_email"),
        user_name: row.get("user_name"),
        id_image_url: row.get("id_image_url"),
        file_name: row.get("file_name"),
        status: RequestStatus::parse(&status)?,
        admin_comment: row.get("admin_comment"),
        submitted_at: parse_datetime(row.get("submitted_at"))?,
        processed_at: parse_optional_datetime(row.get("processed_at")),
    })
}

fn parse_datetime(raw: String) -> Result<DateTime<Utc>> {
    raw.parse()
        .map_err(|e| AppError::DatabaseError(format!("Invalid timestamp in row: {}", e)))
}

fn parse_optional_datetime(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verification::VerificationRequest;

    fn sample_user(email: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: "A".to_string(),
            password_hash: "hash".to_string(),
            photo_url: None,
            is_admin: false,
            verification_status: VerificationStatus::New,
            id_image_url: None,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_submitted_at: None,
            verified_at: None,
            rejected_at: None,
        }
    }

    fn sample_request(user: &UserProfile) -> VerificationRequest {
        VerificationRequest::new(
            user.id,
            user.email.clone(),
            user.display_name.clone(),
            format!("/api/documents/{}/id.png", user.id),
            "id.png".to_string(),
        )
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();

        let fetched = db.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.verification_status, VerificationStatus::New);
        assert!(!fetched.is_admin);

        assert!(db.get_user_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn submission_moves_profile_to_pending() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();

        let request = sample_request(&user);
        db.record_submission(&request).await.unwrap();

        let profile = db.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::Pending);
        assert_eq!(profile.id_image_url, Some(request.id_image_url.clone()));
        assert!(profile.last_submitted_at.is_some());

        let pending = db.list_pending_requests().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, request.id);
    }

    #[tokio::test]
    async fn submission_refused_while_pending() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();

        db.record_submission(&sample_request(&user)).await.unwrap();
        let err = db.record_submission(&sample_request(&user)).await.unwrap_err();
        assert!(matches!(err, AppError::PolicyError(_)));

        // The refused submission left no extra request behind.
        assert_eq!(db.list_pending_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approve_updates_both_records_together() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();
        let request = sample_request(&user);
        db.record_submission(&request).await.unwrap();

        db.apply_review(&request.id, ReviewDecision::Approve, None)
            .await
            .unwrap();

        let stored = db.get_request_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert!(stored.processed_at.is_some());

        let profile = db.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::Verified);
        assert!(profile.verified_at.is_some());
    }

    #[tokio::test]
    async fn reject_records_reason_on_both_records() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();
        let request = sample_request(&user);
        db.record_submission(&request).await.unwrap();

        db.apply_review(&request.id, ReviewDecision::Reject, Some("blurry"))
            .await
            .unwrap();

        let stored = db.get_request_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Rejected);
        assert_eq!(stored.admin_comment.as_deref(), Some("blurry"));

        let profile = db.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::Rejected);
        assert_eq!(profile.rejection_reason.as_deref(), Some("blurry"));
        assert!(profile.rejected_at.is_some());
    }

    #[tokio::test]
    async fn second_review_of_same_request_is_refused() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();
        let request = sample_request(&user);
        db.record_submission(&request).await.unwrap();

        db.apply_review(&request.id, ReviewDecision::Approve, None)
            .await
            .unwrap();
        let err = db
            .apply_review(&request.id, ReviewDecision::Reject, Some("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PolicyError(_)));

        // The losing review changed nothing.
        let profile = db.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::Verified);
        assert!(profile.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn resubmission_after_rejection_clears_reason() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();
        let first = sample_request(&user);
        db.record_submission(&first).await.unwrap();
        db.apply_review(&first.id, ReviewDecision::Reject, Some("blurry"))
            .await
            .unwrap();

        let second = sample_request(&user);
        db.record_submission(&second).await.unwrap();

        let profile = db.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(profile.verification_status, VerificationStatus::Pending);
        assert!(profile.rejection_reason.is_none());

        // History accumulates; only the latest request is pending.
        let latest = db.get_latest_request_for_user(&user.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(db.list_pending_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn token_lifecycle() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let user = sample_user("a@x.com");
        db.create_user(&user).await.unwrap();

        let expires = Utc::now() + chrono::Duration::hours(24);
        db.store_user_token(&user.id, "jti-1", "hash-1", expires)
            .await
            .unwrap();
        assert!(db.is_token_valid("jti-1").await.unwrap());
        assert_eq!(db.get_user_active_tokens_count(&user.id).await.unwrap(), 1);

        db.revoke_token("jti-1").await.unwrap();
        assert!(!db.is_token_valid("jti-1").await.unwrap());
    }
}
