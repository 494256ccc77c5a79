use super::models::{CreatePostRequest, Post, PostOwner, PostRow, UpdatePostRequest};
use super::validators::{normalize_image_url, normalize_tags, CreatePostValidator, UpdatePostValidator};
use crate::common::helpers::{now_timestamp, tags_to_column};
use crate::common::{generate_post_id, ApiError, Validator};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.tags, p.image_url, p.author_id,
           u.name AS author_name, u.avatar AS author_avatar,
           p.created_at, p.updated_at
    FROM posts p
    LEFT JOIN users u ON u.id = p.author_id
"#;

/// Mutation guarded by the ownership check
#[derive(Debug, Clone, Copy)]
pub enum OwnerAction {
    Edit,
    Delete,
}

impl OwnerAction {
    fn forbidden_message(&self) -> &'static str {
        match self {
            OwnerAction::Edit => "You can only edit your own blogs",
            OwnerAction::Delete => "You can only delete your own blogs",
        }
    }
}

fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> ApiError {
    move |e| {
        error!(error = %e, operation = operation, "Post store operation failed");
        ApiError::DatabaseError(e)
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Blog not found".to_string())
}

pub struct PostsService {
    db: SqlitePool,
}

impl PostsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Public reads
    // ============================================================================

    /// All posts, newest first
    pub async fn list_all(&self) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} ORDER BY p.created_at DESC, p.id DESC",
            POST_SELECT
        ))
        .fetch_all(&self.db)
        .await
        .map_err(db_error("list_all"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    pub async fn get_by_id(&self, post_id: &str) -> Result<Post, ApiError> {
        sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = ?", POST_SELECT))
            .bind(post_id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error("get_by_id"))?
            .map(Post::from)
            .ok_or_else(not_found)
    }

    /// Posts written by `owner_id`, newest first
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.author_id = ? ORDER BY p.created_at DESC, p.id DESC",
            POST_SELECT
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(db_error("list_by_owner"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    // ============================================================================
    // Owner mutations
    // ============================================================================

    pub async fn create(&self, owner_id: &str, request: CreatePostRequest) -> Result<Post, ApiError> {
        CreatePostValidator.validate(&request).into_result()?;

        let post_id = generate_post_id();
        let now = now_timestamp();
        let title = request.title.as_deref().unwrap_or_default().trim();
        let content = request.content.as_deref().unwrap_or_default();
        let tags = tags_to_column(&normalize_tags(&request.tags));

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, tags, image_url, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post_id)
        .bind(title)
        .bind(content)
        .bind(&tags)
        .bind(normalize_image_url(request.image_url.as_deref()))
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(db_error("create"))?;

        info!(post_id = %post_id, user_id = %owner_id, "Created blog post");

        self.get_by_id(&post_id).await
    }

    /// Loads the current owner from the store and compares it with the caller
    pub async fn ensure_owner(
        &self,
        post_id: &str,
        caller_id: &str,
        action: OwnerAction,
    ) -> Result<(), ApiError> {
        let owner = sqlx::query_as::<_, PostOwner>("SELECT author_id FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error("ensure_owner"))?
            .ok_or_else(not_found)?;

        if owner.author_id != caller_id {
            warn!(
                post_id = %post_id,
                user_id = %caller_id,
                action = ?action,
                "Rejected mutation of another user's post"
            );
            return Err(ApiError::Forbidden(action.forbidden_message().to_string()));
        }

        Ok(())
    }

    /// Applies the fields present in `request`; absent fields keep their values
    pub async fn update(
        &self,
        post_id: &str,
        caller_id: &str,
        request: UpdatePostRequest,
    ) -> Result<Post, ApiError> {
        UpdatePostValidator.validate(&request).into_result()?;
        self.ensure_owner(post_id, caller_id, OwnerAction::Edit).await?;

        if request.is_empty() {
            return self.get_by_id(post_id).await;
        }

        let mut updates = Vec::new();
        let mut params: Vec<Option<String>> = Vec::new();

        if let Some(title) = &request.title {
            updates.push("title = ?");
            params.push(Some(title.trim().to_string()));
        }

        if let Some(content) = &request.content {
            updates.push("content = ?");
            params.push(Some(content.clone()));
        }

        if let Some(tags) = &request.tags {
            updates.push("tags = ?");
            params.push(Some(tags_to_column(&normalize_tags(tags))));
        }

        if let Some(image_url) = &request.image_url {
            updates.push("image_url = ?");
            params.push(normalize_image_url(image_url.as_deref()));
        }

        updates.push("updated_at = ?");
        params.push(Some(now_timestamp()));

        // The owner predicate repeats the check inside the write itself
        let query = format!(
            "UPDATE posts SET {} WHERE id = ? AND author_id = ?",
            updates.join(", ")
        );

        let mut query_builder = sqlx::query(&query);
        for param in params {
            query_builder = query_builder.bind(param);
        }

        let result = query_builder
            .bind(post_id)
            .bind(caller_id)
            .execute(&self.db)
            .await
            .map_err(db_error("update"))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        info!(post_id = %post_id, user_id = %caller_id, "Updated blog post");

        self.get_by_id(post_id).await
    }

    /// Hard delete, owner only
    pub async fn delete(&self, post_id: &str, caller_id: &str) -> Result<(), ApiError> {
        self.ensure_owner(post_id, caller_id, OwnerAction::Delete)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND author_id = ?")
            .bind(post_id)
            .bind(caller_id)
            .execute(&self.db)
            .await
            .map_err(db_error("delete"))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        info!(post_id = %post_id, user_id = %caller_id, "Deleted blog post");

        Ok(())
    }
}
