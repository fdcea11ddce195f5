use crate::models::user::{Role, UserProfile, VerificationStatus};
use crate::models::verification::{RequestStatus, ReviewDecision, VerificationRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionsResponse {
    pub active_sessions: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub verification_status: VerificationStatus,
    pub id_image_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        ProfileResponse {
            user_id: profile.id,
            role: profile.role(),
            email: profile.email,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
            verification_status: profile.verification_status,
            id_image_url: profile.id_image_url,
            rejection_reason: profile.rejection_reason,
            created_at: profile.created_at,
            last_submitted_at: profile.last_submitted_at,
            verified_at: profile.verified_at,
            rejected_at: profile.rejected_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub request_id: Option<Uuid>,
    pub verification_status: Option<VerificationStatus>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationStatusResponse {
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub latest_request: Option<RequestSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub id_image_url: String,
    pub file_name: String,
    pub status: RequestStatus,
    pub admin_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<VerificationRequest> for RequestSummary {
    fn from(request: VerificationRequest) -> Self {
        RequestSummary {
            id: request.id,
            user_id: request.user_id,
            user_email: request.user_email,
            user_name: request.user_name,
            id_image_url: request.id_image_url,
            file_name: request.file_name,
            status: request.status,
            admin_comment: request.admin_comment,
            submitted_at: request.submitted_at,
            processed_at: request.processed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingQueueResponse {
    pub pending_count: usize,
    pub requests: Vec<RequestSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub request_status: Option<RequestStatus>,
    pub profile_status: Option<VerificationStatus>,
    pub message: String,
}
