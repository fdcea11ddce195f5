use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn rate_limit_per_sec() -> u32 {
    std::env::var("RATE_LIMIT_PER_SEC")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5)
}

static RATE_LIMITER: Lazy<DashMap<String, (u32, Instant)>> = Lazy::new(DashMap::new);

/// Per-IP fixed-window rate limiter.
pub async fn global_rate_limiter(request: Request, next: Next) -> Result<Response, StatusCode> {
    let ip = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let now = Instant::now();
    let mut entry = RATE_LIMITER.entry(ip).or_insert((0, now));

    if now.duration_since(entry.1) > Duration::from_secs(1) {
        *entry = (1, now);
    } else {
        entry.0 += 1;
    }

    if entry.0 > rate_limit_per_sec() {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}

/// Tags every request with a UUID and wraps handler execution in a tracing
/// span carrying it.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri()
    );
    let _enter = span.enter();
    next.run(req).await
}
