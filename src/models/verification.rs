use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Outcome recorded on a verification request. Created `pending`, mutated
/// exactly once by an administrator, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(AppError::InternalError(format!(
                "Unknown request status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An administrator's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Submitter snapshot taken at submission time.
    pub user_email: String,
    pub user_name: String,
    pub id_image_url: String,
    pub file_name: String,
    pub status: RequestStatus,
    /// Set only on rejection.
    pub admin_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl VerificationRequest {
    pub fn new(
        user_id: Uuid,
        user_email: String,
        user_name: String,
        id_image_url: String,
        file_name: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_email,
            user_name,
            id_image_url,
            file_name,
            status: RequestStatus::Pending,
            admin_comment: None,
            submitted_at: Utc::now(),
            processed_at: None,
        }
    }
}
