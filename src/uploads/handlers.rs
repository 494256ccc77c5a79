// src/uploads/handlers.rs

use axum::{
    extract::{Extension, Json, Multipart},
    http::StatusCode,
};
use infer::Infer;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::fs as tokio_fs;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// File size limit: 5MB
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// Accepted content types and the extension stored files get
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/blogs/upload - Store a cover image and return its relative URL
pub async fn upload_image(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let uploads_dir = state_lock.read().await.uploads_dir.clone();

    info!(user_id = %authed.id, "Image upload initiated");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        ApiError::BadRequest("Invalid multipart body".to_string())
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file data".to_string()))?;

        let extension = validate_upload(content_type.as_deref(), &data)?;
        let url = save_upload(&uploads_dir, extension, &data).await?;

        info!(user_id = %authed.id, url = %url, size = data.len(), "Image uploaded");

        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Checks size and type of an uploaded image and returns the extension to store it under.
///
/// The declared content type must be on the allow-list. When the bytes carry a
/// recognizable signature, that detected type must be on the list too.
pub fn validate_upload(content_type: Option<&str>, data: &[u8]) -> Result<&'static str, ApiError> {
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(
            "File size exceeds 5MB limit".to_string(),
        ));
    }

    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .unwrap_or_default();

    let extension = extension_for(&declared).ok_or_else(invalid_type)?;

    if let Some(detected) = Infer::new().get(data) {
        if extension_for(detected.mime_type()).is_none() {
            warn!(
                declared = %declared,
                detected = %detected.mime_type(),
                "Upload content does not match an allowed image type"
            );
            return Err(invalid_type());
        }
    }

    Ok(extension)
}

fn extension_for(mime_type: &str) -> Option<&'static str> {
    let mime_type = if mime_type == "image/jpg" {
        "image/jpeg"
    } else {
        mime_type
    };

    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == mime_type)
        .map(|(_, ext)| *ext)
}

fn invalid_type() -> ApiError {
    ApiError::BadRequest(
        "Invalid image type. Only JPEG, PNG, GIF, and WebP are supported".to_string(),
    )
}

/// Writes the file under a generated name and returns its public relative URL
pub async fn save_upload(uploads_dir: &Path, extension: &str, data: &[u8]) -> Result<String, ApiError> {
    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path = uploads_dir.join(&filename);

    tokio_fs::create_dir_all(uploads_dir).await.map_err(|e| {
        error!(error = %e, dir = %uploads_dir.display(), "Failed to create uploads directory");
        ApiError::InternalServer("Failed to save file".to_string())
    })?;

    tokio_fs::write(&file_path, data).await.map_err(|e| {
        error!(error = %e, file_path = %file_path.display(), "Failed to save uploaded file");
        ApiError::InternalServer("Failed to save file".to_string())
    })?;

    Ok(format!("/uploads/{}", filename))
}
