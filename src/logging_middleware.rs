// src/logging_middleware.rs
//! Middleware for logging JSON request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, enabled, Level};

/// Only JSON and form bodies are buffered; uploads and static files pass through untouched
fn is_loggable(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json") || ct.starts_with("text/"))
        .unwrap_or(false)
}

fn render_body(bytes: &[u8]) -> Option<String> {
    let body_str = std::str::from_utf8(bytes).ok()?;
    // Try to parse as JSON for pretty printing
    match serde_json::from_str::<serde_json::Value>(body_str) {
        Ok(json) => Some(
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()),
        ),
        Err(_) => Some(body_str.to_string()),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let request = if is_loggable(request.headers()) {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        if let Some(body) = render_body(&bytes).filter(|b| !b.is_empty()) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %body,
                "Request"
            );
        }

        Request::from_parts(parts, Body::from(bytes))
    } else {
        debug!(method = %request.method(), uri = %request.uri(), "Request");
        request
    };

    let response = next.run(request).await;

    if !is_loggable(response.headers()) {
        debug!(status = %response.status(), "Response");
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = render_body(&bytes).filter(|b| !b.is_empty()) {
        debug!(status = %parts.status, response_body = %body, "Response");
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
