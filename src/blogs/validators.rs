use super::models::{CreatePostRequest, UpdatePostRequest};
use crate::common::{ValidationResult, Validator};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_LENGTH: usize = 32;

pub struct CreatePostValidator;
pub struct UpdatePostValidator;

impl Validator<CreatePostRequest> for CreatePostValidator {
    fn validate(&self, data: &CreatePostRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.title.as_deref().map(str::trim) {
            None | Some("") => result.add_error("title", "Title is required"),
            Some(title) => result.merge(validate_title(title)),
        }

        if data.content.as_deref().map_or(true, |c| c.trim().is_empty()) {
            result.add_error("content", "Content is required");
        }

        result.merge(validate_tags(&data.tags));

        if let Some(url) = &data.image_url {
            result.merge(validate_image_url(url));
        }

        result
    }
}

impl Validator<UpdatePostRequest> for UpdatePostValidator {
    fn validate(&self, data: &UpdatePostRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(title) = &data.title {
            if title.trim().is_empty() {
                result.add_error("title", "Title cannot be empty");
            } else {
                result.merge(validate_title(title.trim()));
            }
        }

        if let Some(content) = &data.content {
            if content.trim().is_empty() {
                result.add_error("content", "Content cannot be empty");
            }
        }

        if let Some(tags) = &data.tags {
            result.merge(validate_tags(tags));
        }

        if let Some(Some(url)) = &data.image_url {
            result.merge(validate_image_url(url));
        }

        result
    }
}

fn validate_title(title: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    if title.chars().count() > MAX_TITLE_LENGTH {
        result.add_error(
            "title",
            &format!("Title must not exceed {} characters", MAX_TITLE_LENGTH),
        );
    }
    result
}

/// Validates the tag list: bounded count, no blank or oversized tags
pub fn validate_tags(tags: &[String]) -> ValidationResult {
    let mut result = ValidationResult::new();

    if tags.len() > MAX_TAGS {
        result.add_error("tags", &format!("At most {} tags are allowed", MAX_TAGS));
    }

    if tags.iter().any(|t| t.trim().is_empty()) {
        result.add_error("tags", "Tags cannot be empty");
    }

    if tags.iter().any(|t| t.trim().chars().count() > MAX_TAG_LENGTH) {
        result.add_error(
            "tags",
            &format!("Tags must not exceed {} characters", MAX_TAG_LENGTH),
        );
    }

    result
}

/// Cover images are either uploads (relative path) or absolute http(s) URLs.
/// An empty string is accepted and clears the image.
pub fn validate_image_url(url: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let url = url.trim();

    if !url.is_empty()
        && !url.starts_with('/')
        && !url.starts_with("http://")
        && !url.starts_with("https://")
    {
        result.add_error(
            "imageUrl",
            "Image URL must be a relative path or start with http:// or https://",
        );
    }

    result
}

/// Trimmed copy of the tags in their original order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter().map(|t| t.trim().to_string()).collect()
}

/// `None` for a blank image URL so the column is cleared
pub fn normalize_image_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}
