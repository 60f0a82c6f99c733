// CORS and request logging middleware

use axum::{body::Body, http::HeaderValue, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
///
/// Tags every request with a short id, logs method, path, status and
/// latency, and echoes the id back in `x-request-id`.
pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    tracing::info!("[{}] {} {}", request_id, method, path);

    let mut response = next.run(request).await;

    tracing::info!(
        "[{}] {} {} -> {} ({:.1}ms)",
        request_id,
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Create CORS middleware layer
///
/// Allows all origins, methods, and headers so the chat UI can be served
/// from anywhere.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
