use axum::{
    extract::{Extension, FromRequestParts, Multipart, Path},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::types::*;
use crate::api::AppState;
use crate::errors::AppError;
use crate::models::user::UserProfile;

// JWT extractor for Authorization: Bearer ...
pub struct AuthBearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return Ok(AuthBearer(token.to_string()));
                }
            }
        }
        Err((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header".to_string(),
        ))
    }
}

/// Resolve the profile behind a bearer token.
async fn current_user(state: &AppState, token: &str) -> Result<UserProfile, StatusCode> {
    state.auth.current_profile(token).await.map_err(|e| {
        info!(action = "token_rejected", error = %e);
        StatusCode::UNAUTHORIZED
    })
}

/// Admin gate: resolves the profile and refuses non-administrators before
/// any queue data is touched.
async fn require_admin(state: &AppState, token: &str) -> Result<UserProfile, (StatusCode, String)> {
    let user = current_user(state, token)
        .await
        .map_err(|status| (status, "Invalid or expired token".to_string()))?;
    if !user.is_admin {
        info!(action = "admin_access_denied", user_id = %user.id);
        return Err((
            StatusCode::FORBIDDEN,
            "You don't have admin privileges to access this panel.".to_string(),
        ));
    }
    Ok(user)
}

fn status_for_error(e: &AppError) -> StatusCode {
    match e {
        AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
        AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
        AppError::PolicyError(_) => StatusCode::CONFLICT,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Auth API endpoints
pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/validate", post(validate))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/sessions", get(sessions))
}

/// Verification endpoints for the signed-in user
pub fn verification_router() -> Router {
    Router::new()
        .route("/submit", post(submit_verification))
        .route("/status", get(verification_status))
}

/// Administrator endpoints
pub fn admin_router() -> Router {
    Router::new()
        .route("/verifications", get(admin_pending_queue))
        .route("/verifications/:id/review", post(admin_review))
}

#[utoipa::path(post, path = "/api/auth/register", request_body = RegisterRequest, responses((status = 200, body = RegisterResponse)))]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = req.email.trim().to_string();

    // Check for an existing account first so the conflict message is stable.
    if let Ok(Some(_)) = state.db.get_user_by_email(&email).await {
        info!(action = "register_email_conflict", user = %email);
        return (
            StatusCode::CONFLICT,
            Json(RegisterResponse {
                user_id: Uuid::nil(),
                message: "This email is already registered. Try logging in or use a different email."
                    .to_string(),
            }),
        );
    }

    match state
        .auth
        .register_user(&email, &req.password, &req.display_name)
        .await
    {
        Ok(user_id) => {
            info!(action = "register_success", user = %email);
            (
                StatusCode::OK,
                Json(RegisterResponse {
                    user_id,
                    message: "Account created successfully".to_string(),
                }),
            )
        }
        Err(e @ AppError::ValidationError(_)) => (
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                user_id: Uuid::nil(),
                message: e.to_string(),
            }),
        ),
        Err(e) => {
            error!(action = "register_failed", user = %email, error = %e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegisterResponse {
                    user_id: Uuid::nil(),
                    message: "Could not create account. Please try again later.".to_string(),
                }),
            )
        }
    }
}

#[utoipa::path(post, path = "/api/auth/login", request_body = LoginRequest, responses((status = 200, body = LoginResponse)))]
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    match state
        .auth
        .login_and_generate_token(req.email.trim(), &req.password)
        .await
    {
        Ok(token) => {
            info!(action = "login_success", user = %req.email);
            (
                StatusCode::OK,
                Json(LoginResponse {
                    token,
                    expires_in: 86400,
                    message: "Signed in successfully".to_string(),
                }),
            )
        }
        Err(e) => {
            info!(action = "login_failed", user = %req.email, error = %e);
            // Authentication failures carry a fixed user-facing message;
            // anything else stays generic.
            let message = match &e {
                AppError::AuthenticationError(msg) => msg.clone(),
                _ => "Sign in failed. Please try again later.".to_string(),
            };
            (
                status_for_error(&e),
                Json(LoginResponse {
                    token: "".to_string(),
                    expires_in: 0,
                    message,
                }),
            )
        }
    }
}

#[utoipa::path(post, path = "/api/auth/validate", request_body = TokenRequest, responses((status = 200, body = ValidateResponse)))]
pub async fn validate(
    Extension(state): Extension<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    match state.auth.current_profile(&req.token).await {
        Ok(user) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                user_id: Some(user.id),
                email: Some(user.email.clone()),
                display_name: Some(user.display_name.clone()),
                role: Some(user.role()),
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(ValidateResponse {
                valid: false,
                user_id: None,
                email: None,
                display_name: None,
                role: None,
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/auth/refresh", request_body = TokenRequest, responses((status = 200, body = RefreshResponse)))]
pub async fn refresh(
    Extension(state): Extension<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    match state.auth.refresh_token(&req.token).await {
        Ok(token) => (
            StatusCode::OK,
            Json(RefreshResponse {
                token,
                expires_in: 86400,
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(RefreshResponse {
                token: "".to_string(),
                expires_in: 0,
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/auth/logout", request_body = TokenRequest, responses((status = 200, body = LogoutResponse)))]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    match state.auth.logout(&req.token).await {
        Ok(_) => (
            StatusCode::OK,
            Json(LogoutResponse {
                message: "Signed out successfully".to_string(),
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(LogoutResponse {
                message: "Sign out failed".to_string(),
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/auth/logout-all", request_body = TokenRequest, responses((status = 200, body = LogoutResponse)))]
pub async fn logout_all(
    Extension(state): Extension<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    match state.auth.logout_all_devices(&req.token).await {
        Ok(_) => (
            StatusCode::OK,
            Json(LogoutResponse {
                message: "Signed out of all sessions".to_string(),
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(LogoutResponse {
                message: "Sign out failed".to_string(),
            }),
        ),
    }
}

#[utoipa::path(get, path = "/api/auth/sessions", responses((status = 200, body = SessionsResponse)))]
pub async fn sessions(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
) -> impl IntoResponse {
    match state.auth.get_user_sessions_count(&token).await {
        Ok(count) => (
            StatusCode::OK,
            Json(SessionsResponse {
                active_sessions: count,
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(SessionsResponse { active_sessions: 0 }),
        ),
    }
}

#[utoipa::path(get, path = "/api/profile", responses((status = 200, body = ProfileResponse), (status = 401, description = "Unauthenticated")))]
pub async fn get_profile(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
) -> Result<Json<ProfileResponse>, StatusCode> {
    let user = current_user(&state, &token).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/api/verification/submit",
    responses(
        (status = 200, body = SubmitResponse),
        (status = 400, description = "Invalid file type or size"),
        (status = 409, description = "Submission not allowed in current state")
    )
)]
pub async fn submit_verification(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let user = match current_user(&state, &token).await {
        Ok(user) => user,
        Err(status) => {
            return (
                status,
                Json(SubmitResponse {
                    request_id: None,
                    verification_status: None,
                    message: "Invalid or expired token".to_string(),
                }),
            )
        }
    };

    // One file per submission; the field is named "document".
    let mut document: Option<(String, String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("document") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        document = Some((file_name, content_type, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        error!(action = "submission_read_failed", user_id = %user.id, error = %e);
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(SubmitResponse {
                                request_id: None,
                                verification_status: None,
                                message: "Could not read the uploaded file".to_string(),
                            }),
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(action = "submission_multipart_failed", user_id = %user.id, error = %e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(SubmitResponse {
                        request_id: None,
                        verification_status: None,
                        message: "Malformed upload".to_string(),
                    }),
                );
            }
        }
    }

    let Some((file_name, content_type, bytes)) = document else {
        return (
            StatusCode::BAD_REQUEST,
            Json(SubmitResponse {
                request_id: None,
                verification_status: None,
                message: "Please select an ID file first!".to_string(),
            }),
        );
    };

    match state
        .verification
        .submit(&user.id, &file_name, &content_type, &bytes)
        .await
    {
        Ok(request) => (
            StatusCode::OK,
            Json(SubmitResponse {
                request_id: Some(request.id),
                verification_status: Some(crate::models::user::VerificationStatus::Pending),
                message: "ID submitted for verification!".to_string(),
            }),
        ),
        Err(e) => {
            info!(action = "submission_refused", user_id = %user.id, error = %e);
            let message = match &e {
                AppError::ValidationError(msg) | AppError::PolicyError(msg) => msg.clone(),
                other => format!("Upload failed: {}", other),
            };
            (
                status_for_error(&e),
                Json(SubmitResponse {
                    request_id: None,
                    verification_status: None,
                    message,
                }),
            )
        }
    }
}

#[utoipa::path(get, path = "/api/verification/status", responses((status = 200, body = VerificationStatusResponse), (status = 401, description = "Unauthenticated")))]
pub async fn verification_status(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
) -> Result<Json<VerificationStatusResponse>, StatusCode> {
    let user = current_user(&state, &token).await?;
    let (profile, latest) = state
        .verification
        .status_for(&user.id)
        .await
        .map_err(|e| {
            error!(action = "status_fetch_failed", user_id = %user.id, error = %e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(VerificationStatusResponse {
        verification_status: profile.verification_status,
        rejection_reason: profile.rejection_reason,
        latest_request: latest.map(Into::into),
    }))
}

#[utoipa::path(get, path = "/api/admin/verifications", responses((status = 200, body = PendingQueueResponse), (status = 403, description = "Not an administrator")))]
pub async fn admin_pending_queue(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
) -> Result<Json<PendingQueueResponse>, (StatusCode, String)> {
    let admin = require_admin(&state, &token).await?;

    let requests = state.verification.pending_requests().await.map_err(|e| {
        error!(action = "queue_fetch_failed", admin_id = %admin.id, error = %e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not load the verification queue".to_string(),
        )
    })?;

    let requests: Vec<RequestSummary> = requests.into_iter().map(Into::into).collect();
    Ok(Json(PendingQueueResponse {
        pending_count: requests.len(),
        requests,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/verifications/{id}/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, body = ReviewResponse),
        (status = 400, description = "Missing rejection reason"),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Request already processed")
    )
)]
pub async fn admin_review(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
    Path(request_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> impl IntoResponse {
    let admin = match require_admin(&state, &token).await {
        Ok(admin) => admin,
        Err((status, message)) => {
            return (
                status,
                Json(ReviewResponse {
                    request_status: None,
                    profile_status: None,
                    message,
                }),
            )
        }
    };

    match state
        .verification
        .review(&request_id, req.decision, req.reason.as_deref())
        .await
    {
        Ok((request, profile)) => {
            info!(
                action = "review_applied",
                admin_id = %admin.id,
                request_id = %request_id,
                outcome = %request.status
            );
            (
                StatusCode::OK,
                Json(ReviewResponse {
                    request_status: Some(request.status),
                    profile_status: Some(profile.verification_status),
                    message: "Review applied".to_string(),
                }),
            )
        }
        Err(e) => {
            info!(action = "review_refused", admin_id = %admin.id, request_id = %request_id, error = %e);
            let message = match &e {
                AppError::ValidationError(msg)
                | AppError::PolicyError(msg)
                | AppError::NotFound(msg) => msg.clone(),
                other => format!("Review failed: {}", other),
            };
            (
                status_for_error(&e),
                Json(ReviewResponse {
                    request_status: None,
                    profile_status: None,
                    message,
                }),
            )
        }
    }
}

/// Serve a stored ID document. Only the owning user and administrators may
/// retrieve it.
pub async fn get_document(
    Extension(state): Extension<AppState>,
    AuthBearer(token): AuthBearer,
    Path((user_id, file_name)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = current_user(&state, &token).await?;
    if user.id != user_id && !user.is_admin {
        info!(action = "document_access_denied", user_id = %user.id, owner_id = %user_id);
        return Err(StatusCode::FORBIDDEN);
    }

    let bytes = state
        .store
        .read(&user_id, &file_name)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok((
        [(
            axum::http::header::CONTENT_TYPE,
            crate::storage::DocumentStore::content_type_for(&file_name),
        )],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::SqliteDatabase;
    use crate::events::EventBus;
    use crate::models::user::VerificationStatus;
    use crate::services::auth::AuthService;
    use crate::services::verification::VerificationService;
    use crate::storage::DocumentStore;
    use chrono::Utc;
    use std::sync::Arc;

    async fn test_state(dir: &tempfile::TempDir) -> AppState {
        let db = Arc::new(SqliteDatabase::open_in_memory().await.unwrap());
        let store = Arc::new(DocumentStore::new(dir.path()).unwrap());
        let events = Arc::new(EventBus::new(16));
        let auth = Arc::new(AuthService::with_secret(db.clone(), "test-secret"));
        let verification = Arc::new(VerificationService::new(
            db.clone(),
            store.clone(),
            events.clone(),
        ));
        AppState {
            db,
            store,
            events,
            auth,
            verification,
        }
    }

    async fn insert_admin(state: &AppState, email: &str) {
        let now = Utc::now();
        let admin = UserProfile {
            id: uuid::Uuid::new_v4(),
            email: email.to_string(),
            display_name: "Admin".to_string(),
            password_hash: crate::utils::crypto::PasswordManager::hash_password("secret12")
                .unwrap(),
            photo_url: None,
            is_admin: true,
            verification_status: VerificationStatus::New,
            id_image_url: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            last_submitted_at: None,
            verified_at: None,
            rejected_at: None,
        };
        state.db.create_user(&admin).await.unwrap();
    }

    #[tokio::test]
    async fn admin_gate_refuses_regular_users() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        state
            .auth
            .register_user("user@x.com", "secret12", "A")
            .await
            .unwrap();
        let token = state
            .auth
            .login_and_generate_token("user@x.com", "secret12")
            .await
            .unwrap();

        let (status, _) = require_admin(&state, &token).await.unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_gate_refuses_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let (status, _) = require_admin(&state, "not-a-token").await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_gate_admits_administrators() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        insert_admin(&state, "admin@x.com").await;
        let token = state
            .auth
            .login_and_generate_token("admin@x.com", "secret12")
            .await
            .unwrap();

        let admin = require_admin(&state, &token).await.unwrap();
        assert!(admin.is_admin);
    }
}
