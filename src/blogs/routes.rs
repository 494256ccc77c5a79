use super::handlers;
use axum::{routing::get, Router};

/// Creates the blogs router
///
/// Reads are public; everything else requires a bearer credential and
/// update/delete additionally require ownership of the post.
pub fn blogs_routes() -> Router {
    Router::new()
        .route(
            "/api/blogs",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/blogs/user/me", get(handlers::list_my_posts))
        .route(
            "/api/blogs/:id",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
}
