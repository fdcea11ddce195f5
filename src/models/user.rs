use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a user's identity verification.
///
/// `new → pending → {verified, rejected}`, `rejected → pending` on
/// resubmission. `verified` is terminal. A `pending` submission stays
/// pending until an administrator acts; there is no expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    New,
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::New => "new",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(VerificationStatus::New),
            "pending" => Ok(VerificationStatus::Pending),
            "verified" => Ok(VerificationStatus::Verified),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(AppError::InternalError(format!(
                "Unknown verification status: {}",
                other
            ))),
        }
    }

    /// Only `new` and `rejected` profiles may enter `pending`.
    pub fn can_submit(&self) -> bool {
        matches!(self, VerificationStatus::New | VerificationStatus::Rejected)
    }

    /// Transition taken by a validated, successfully stored submission.
    pub fn submit(&self) -> Result<Self> {
        if self.can_submit() {
            Ok(VerificationStatus::Pending)
        } else {
            Err(AppError::PolicyError(format!(
                "Cannot submit a document while verification is {}",
                self.as_str()
            )))
        }
    }

    /// Transition taken by an administrator approving a pending submission.
    pub fn approve(&self) -> Result<Self> {
        match self {
            VerificationStatus::Pending => Ok(VerificationStatus::Verified),
            other => Err(AppError::PolicyError(format!(
                "Cannot approve a profile whose verification is {}",
                other.as_str()
            ))),
        }
    }

    /// Transition taken by an administrator rejecting a pending submission.
    pub fn reject(&self) -> Result<Self> {
        match self {
            VerificationStatus::Pending => Ok(VerificationStatus::Rejected),
            other => Err(AppError::PolicyError(format!(
                "Cannot reject a profile whose verification is {}",
                other.as_str()
            ))),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set resolved from the session, used for route guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub photo_url: Option<String>,
    /// Never settable through any user-facing operation.
    pub is_admin: bool,
    pub verification_status: VerificationStatus,
    /// Most recently submitted document, if any.
    pub id_image_url: Option<String>,
    /// Present only while `verification_status` is `rejected`.
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::User
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_rejected_may_submit() {
        assert!(VerificationStatus::New.can_submit());
        assert!(VerificationStatus::Rejected.can_submit());
        assert_eq!(
            VerificationStatus::New.submit().unwrap(),
            VerificationStatus::Pending
        );
        assert_eq!(
            VerificationStatus::Rejected.submit().unwrap(),
            VerificationStatus::Pending
        );
    }

    #[test]
    fn pending_and_verified_may_not_submit() {
        assert!(matches!(
            VerificationStatus::Pending.submit(),
            Err(AppError::PolicyError(_))
        ));
        assert!(matches!(
            VerificationStatus::Verified.submit(),
            Err(AppError::PolicyError(_))
        ));
    }

    #[test]
    fn only_pending_can_be_reviewed() {
        assert_eq!(
            VerificationStatus::Pending.approve().unwrap(),
            VerificationStatus::Verified
        );
        assert_eq!(
            VerificationStatus::Pending.reject().unwrap(),
            VerificationStatus::Rejected
        );
        for status in [
            VerificationStatus::New,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            assert!(status.approve().is_err());
            assert!(status.reject().is_err());
        }
    }

    #[test]
    fn verified_is_terminal() {
        let status = VerificationStatus::Verified;
        assert!(status.submit().is_err());
        assert!(status.approve().is_err());
        assert!(status.reject().is_err());
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            VerificationStatus::New,
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(VerificationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(VerificationStatus::parse("unknown").is_err());
    }
}
