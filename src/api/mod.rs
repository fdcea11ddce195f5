use axum::extract::DefaultBodyLimit;
use axum::{response::IntoResponse, Extension, Json, Router};
use hyper::Method;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::database::sqlite::SqliteDatabase;
use crate::events::EventBus;
use crate::services::auth::AuthService;
use crate::services::verification::VerificationService;
use crate::storage::DocumentStore;
use crate::utils::middleware::{global_rate_limiter, request_id_middleware};
use crate::utils::validation::MAX_DOCUMENT_BYTES;

mod routes;
mod types;
mod ws;

/// Shared application context: single writer per concern, passed to the
/// handlers that need it instead of living in a global.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqliteDatabase>,
    pub store: Arc<DocumentStore>,
    pub events: Arc<EventBus>,
    pub auth: Arc<AuthService>,
    pub verification: Arc<VerificationService>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::register,
        routes::login,
        routes::validate,
        routes::refresh,
        routes::logout,
        routes::logout_all,
        routes::sessions,
        routes::get_profile,
        routes::submit_verification,
        routes::verification_status,
        routes::admin_pending_queue,
        routes::admin_review,
    ),
    components(
        schemas(
            types::RegisterRequest,
            types::RegisterResponse,
            types::LoginRequest,
            types::LoginResponse,
            types::TokenRequest,
            types::ValidateResponse,
            types::RefreshResponse,
            types::LogoutResponse,
            types::SessionsResponse,
            types::ProfileResponse,
            types::SubmitResponse,
            types::VerificationStatusResponse,
            types::RequestSummary,
            types::PendingQueueResponse,
            types::ReviewRequest,
            types::ReviewResponse,
            crate::models::user::VerificationStatus,
            crate::models::user::Role,
            crate::models::verification::RequestStatus,
            crate::models::verification::ReviewDecision,
        )
    ),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Profile", description = "Profile endpoints. Require JWT authentication: use the Authorize button and paste your token as 'Bearer <token>'!"),
        (name = "Verification", description = "ID document submission and status"),
        (name = "Admin", description = "Review queue endpoints, administrators only")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        openapi.components.as_mut().unwrap().add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        openapi.security = Some(vec![utoipa::openapi::security::SecurityRequirement::new(
            "bearerAuth",
            Vec::<String>::new(),
        )]);
    }
}

/// Main entry point for the TrueConnect API server.
/// Sets up state, routes, middleware, and documentation endpoints.
pub async fn start_http_server() {
    let openapi = ApiDoc::openapi();

    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "trueconnect.db".to_string());
    let store_root = std::env::var("DOCUMENT_STORE_ROOT").unwrap_or_else(|_| "data".to_string());

    let db = Arc::new(SqliteDatabase::new(&database_path).await.unwrap());
    let store = Arc::new(DocumentStore::new(store_root.as_str()).unwrap());
    let events = Arc::new(EventBus::new(256));
    let auth = Arc::new(AuthService::new(db.clone()));
    let verification = Arc::new(VerificationService::new(
        db.clone(),
        store.clone(),
        events.clone(),
    ));

    let state = AppState {
        db,
        store,
        events,
        auth,
        verification,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/auth", routes::auth_router())
        .route("/api/profile", axum::routing::get(routes::get_profile))
        .nest("/api/verification", routes::verification_router())
        .nest("/api/admin", routes::admin_router())
        .route(
            "/api/documents/:user_id/:file_name",
            axum::routing::get(routes::get_document),
        )
        .route("/api/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health_check))
        // OpenAPI Documentation Routes
        .route("/docs/openapi.json", axum::routing::get(openapi_json))
        // Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi.clone()))
        // Redoc UI
        .merge(Redoc::with_url("/api/redoc", openapi))
        // Uploads may legitimately reach 5 MiB; leave headroom for the
        // multipart envelope.
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 1024 * 1024))
        .layer(Extension(state))
        .layer(cors)
        .layer(axum::middleware::from_fn(global_rate_limiter))
        .layer(axum::middleware::from_fn(request_id_middleware));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse().unwrap();

    println!("🚀 HTTP API running at http://{}/health", addr);
    println!("📚 API Documentation available at: http://{}/api/docs", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await.unwrap(),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Export OpenAPI specification as JSON
async fn openapi_json() -> Json<Value> {
    let openapi = ApiDoc::openapi();
    Json(serde_json::to_value(openapi).unwrap())
}
