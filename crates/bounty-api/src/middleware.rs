//! Cross-cutting layers: CORS and per-request logging.
use std::time::Instant;

use axum::middleware::Next;
use axum::{body::Body, http::Request, response::Response};
use tower_http::cors::CorsLayer;
use tracing::{info, Instrument};
use uuid::Uuid;

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Tag each request with an id and log its outcome.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let span = tracing::info_span!("request", id = %request_id, %method, %path);
    let response = next.run(req).instrument(span).await;

    info!(
        id = %request_id,
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}
