use super::models::{CreatePostRequest, UpdatePostRequest};
use super::services::PostsService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;

async fn posts_service(state: &Arc<RwLock<AppState>>) -> PostsService {
    PostsService::new(state.read().await.db.clone())
}

/// GET /api/blogs - All posts (public)
pub async fn list_posts(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = posts_service(&state).await.list_all().await?;
    Ok(Json(posts))
}

/// GET /api/blogs/:id - One post (public)
pub async fn get_post(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts_service(&state).await.get_by_id(&post_id).await?;
    Ok(Json(post))
}

/// GET /api/blogs/user/me - The caller's posts
pub async fn list_my_posts(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let posts = posts_service(&state).await.list_by_owner(&user.id).await?;
    Ok(Json(posts))
}

/// POST /api/blogs - Create a post owned by the caller
pub async fn create_post(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts_service(&state).await.create(&user.id, request).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/blogs/:id - Partial update, owner only
pub async fn update_post(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(post_id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts_service(&state)
        .await
        .update(&post_id, &user.id, request)
        .await?;
    Ok(Json(post))
}

/// DELETE /api/blogs/:id - Hard delete, owner only
pub async fn delete_post(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    posts_service(&state)
        .await
        .delete(&post_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
