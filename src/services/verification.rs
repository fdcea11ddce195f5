use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::events::EventBus;
use crate::models::user::UserProfile;
use crate::models::verification::{ReviewDecision, VerificationRequest};
use crate::storage::DocumentStore;
use crate::utils::validation::Validator;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Submission Flow and Review Queue operations. Every status transition in
/// the system goes through here.
pub struct VerificationService {
    db: Arc<SqliteDatabase>,
    store: Arc<DocumentStore>,
    events: Arc<EventBus>,
}

impl VerificationService {
    pub fn new(db: Arc<SqliteDatabase>, store: Arc<DocumentStore>, events: Arc<EventBus>) -> Self {
        Self { db, store, events }
    }

    /// Accept one ID document from a user.
    ///
    /// Validation happens before any storage or database write; the policy
    /// guard (`new`/`rejected` only) is checked here and re-checked inside
    /// the submission transaction. A blob whose record writes fail is
    /// deleted again.
    pub async fn submit(
        &self,
        user_id: &Uuid,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<VerificationRequest> {
        Validator::validate_document(file_name, content_type, bytes.len())?;

        let profile = self.db.get_user_by_id(user_id).await?;
        profile.verification_status.submit()?;

        let stored = self.store.store(user_id, file_name, bytes).await?;

        let request = VerificationRequest::new(
            profile.id,
            profile.email.clone(),
            profile.display_name.clone(),
            stored.url.clone(),
            file_name.to_string(),
        );

        if let Err(e) = self.db.record_submission(&request).await {
            if let Err(cleanup) = self.store.remove(&stored).await {
                error!(action = "submission_blob_cleanup_failed", user_id = %user_id, error = %cleanup);
            }
            return Err(e);
        }

        info!(action = "verification_submitted", user_id = %user_id, request_id = %request.id);

        let updated = self.db.get_user_by_id(user_id).await?;
        self.events.publish_profile_update(&updated);
        self.events.publish_queue_update("submitted", &request);

        Ok(request)
    }

    /// Current profile plus the latest request, for the status view.
    pub async fn status_for(
        &self,
        user_id: &Uuid,
    ) -> Result<(UserProfile, Option<VerificationRequest>)> {
        let profile = self.db.get_user_by_id(user_id).await?;
        let latest = self.db.get_latest_request_for_user(user_id).await?;
        Ok((profile, latest))
    }

    /// The admin review queue: pending requests in arrival order.
    pub async fn pending_requests(&self) -> Result<Vec<VerificationRequest>> {
        self.db.list_pending_requests().await
    }

    /// Apply an administrator's decision. Rejections require a non-empty
    /// reason. Both records move together; a request that is no longer
    /// pending yields a policy error and no change.
    pub async fn review(
        &self,
        request_id: &Uuid,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<(VerificationRequest, UserProfile)> {
        let reason = match decision {
            ReviewDecision::Approve => None,
            ReviewDecision::Reject => {
                let reason = reason.unwrap_or_default();
                Validator::validate_rejection_reason(reason)?;
                Some(reason.trim())
            }
        };

        self.db.apply_review(request_id, decision, reason).await?;

        let request = self
            .db
            .get_request_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No request with id {}", request_id)))?;
        let profile = self.db.get_user_by_id(&request.user_id).await?;

        info!(
            action = "verification_reviewed",
            request_id = %request_id,
            user_id = %request.user_id,
            outcome = %request.status
        );

        self.events.publish_queue_update("processed", &request);
        self.events.publish_profile_update(&profile);

        Ok((request, profile))
    }
}
