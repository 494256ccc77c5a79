//! Client side of the blog: persisted login session and a thin API client.

pub mod client;
pub mod error;
pub mod models;
pub mod session;

pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use models::{NewPost, Post, PostChanges, Provider, SessionUser};
pub use session::SessionStore;
