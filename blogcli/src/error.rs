//! Error type shared by the session store and the API client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A protected command ran without a stored credential
    #[error("login required")]
    LoginRequired,

    /// The callback carried an `error` parameter
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("invalid authentication response: {0}")]
    InvalidCallback(String),

    /// The API rejected the stored credential
    #[error("session is no longer valid, please log in again")]
    Unauthorized,

    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0} is not a supported image (jpg, png, gif, webp)")]
    UnsupportedImage(String),

    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
