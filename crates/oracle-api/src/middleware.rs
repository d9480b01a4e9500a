//! Request middleware for the host API.
use axum::middleware::Next;
use axum::{body::Body, http::Request, response::Response};
use std::time::Instant;
use tower_http::cors::CorsLayer;

/// Any origin may call the harness; it serves local tooling and test dashboards,
/// never signed traffic.
pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// One `info` line per request with method, path, status and latency.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request served"
    );
    response
}
