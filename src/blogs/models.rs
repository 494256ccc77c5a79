use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::common::helpers::tags_from_column;

/// Row shape of a post joined with its author's public fields
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Option<String>, // JSON array: ["rust", "web"]
    pub image_url: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorSummary {
    pub id: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Blog post as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub author_id: String,
    pub author: AuthorSummary,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            tags: tags_from_column(row.tags.as_deref()),
            author: AuthorSummary {
                id: row.author_id.clone(),
                name: row.author_name,
                avatar: row.author_avatar,
            },
            id: row.id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Only the owner column; ownership checks never need more
#[derive(Debug, FromRow)]
pub struct PostOwner {
    pub author_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// `image_url`: absent keeps the cover, `null` clears it, a string replaces it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default, alias = "imageUrl", deserialize_with = "present_field")]
    pub image_url: Option<Option<String>>,
}

/// Marks a key that was sent, keeping an explicit `null` as `Some(None)`
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdatePostRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.image_url.is_none()
    }
}
