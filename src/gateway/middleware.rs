//! Request logging middleware
//!
//! Structured log line per request with method, path, status and latency.
//! Ensures every request carries an `x-request-id`: incoming ids are
//! propagated, missing ones minted, and the id is echoed on the response so
//! clients can correlate with the error body's `request_id`.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn request_logger(mut request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let request_id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(v) => v.to_str().unwrap_or_default().to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            id
        }
    };

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "HTTP request processed"
    );

    response
}
