//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /api/auth/:provider` - Start a Google or Facebook login
/// - `GET /api/auth/:provider/callback` - Provider redirect target
/// - `GET /api/auth/validate` - Current user for a bearer credential
/// - `POST /api/auth/logout` - Logout (client-side token removal)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/validate", get(handlers::validate_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/auth/:provider", get(handlers::login_start))
        .route("/api/auth/:provider/callback", get(handlers::oauth_callback))
}
