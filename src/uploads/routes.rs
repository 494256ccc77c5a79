use axum::{extract::DefaultBodyLimit, routing::post, Router};

use super::handlers::{upload_image, MAX_UPLOAD_BYTES};

/// Room for multipart framing on top of the largest accepted file
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES * 2;

pub fn uploads_routes() -> Router {
    Router::new().route(
        "/api/blogs/upload",
        post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
}
