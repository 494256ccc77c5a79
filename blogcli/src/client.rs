//! HTTP client for the blog API

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::models::{
    ApiErrorBody, NewPost, Post, PostChanges, Provider, SessionUser, UploadResponse,
};
use crate::session::SessionStore;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Multipart field the upload endpoint reads the image from
pub const UPLOAD_FIELD: &str = "file";

/// Image type for an upload, from the file extension
pub fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Auth endpoints are called without a credential, except the validate check
pub fn should_attach_token(path: &str) -> bool {
    !path.starts_with("/auth/") || path.starts_with("/auth/validate")
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Base URL from `BLOG_API_URL`
    pub fn from_env(session: SessionStore) -> Self {
        let base_url = env::var("BLOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&base_url, session)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    /// Where the browser goes to start a provider login
    pub fn login_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}", self.base_url, provider)
    }

    /// Resolves a relative asset URL (such as an upload) against the server root
    pub fn asset_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let root = self.base_url.trim_end_matches("/api");
        format!("{}{}", root, url)
    }

    /// Request builder for an API path, with the bearer credential attached when due
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));

        match self.session.token() {
            Some(token) if should_attach_token(path) => builder.bearer_auth(token),
            _ => builder,
        }
    }

    /// Checks the stored credential with the API and refreshes the cached
    /// user from the answer. A 401 clears the session.
    pub async fn initialize(&mut self) -> Result<Option<SessionUser>> {
        if !self.session.is_authenticated() {
            return Ok(None);
        }

        let response = self.request(Method::GET, "/auth/validate").send().await?;
        match self.read_json::<SessionUser>(response).await {
            Ok(user) => {
                self.session.refresh_user(user.clone())?;
                Ok(Some(user))
            }
            Err(ClientError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Tells the API, then clears the local session regardless of the answer
    pub async fn logout(&mut self) -> Result<()> {
        if self.session.is_authenticated() {
            match self.request(Method::POST, "/auth/logout").send().await {
                Ok(response) if !response.status().is_success() => {
                    debug!(status = %response.status(), "Logout call rejected");
                }
                Err(e) => warn!(error = %e, "Logout call failed"),
                _ => {}
            }
        }
        self.session.logout()
    }

    pub async fn list_posts(&mut self) -> Result<Vec<Post>> {
        let response = self.request(Method::GET, "/blogs").send().await?;
        self.read_json(response).await
    }

    pub async fn my_posts(&mut self) -> Result<Vec<Post>> {
        self.session.require_auth("/blogs/mine")?;
        let response = self.request(Method::GET, "/blogs/user/me").send().await?;
        self.read_json(response).await
    }

    pub async fn get_post(&mut self, id: &str) -> Result<Post> {
        let response = self
            .request(Method::GET, &format!("/blogs/{}", id))
            .send()
            .await?;
        self.read_json(response).await
    }

    pub fn create_post_request(&self, post: &NewPost) -> RequestBuilder {
        self.request(Method::POST, "/blogs").json(post)
    }

    pub async fn create_post(&mut self, post: &NewPost) -> Result<Post> {
        self.session.require_auth("/blogs/create")?;
        let response = self.create_post_request(post).send().await?;
        let created: Post = self.read_json(response).await?;
        info!(post_id = %created.id, "Created post");
        Ok(created)
    }

    pub fn update_post_request(&self, id: &str, changes: &PostChanges) -> RequestBuilder {
        self.request(Method::PUT, &format!("/blogs/{}", id))
            .json(changes)
    }

    pub async fn update_post(&mut self, id: &str, changes: &PostChanges) -> Result<Post> {
        self.session.require_auth(&format!("/blogs/edit/{}", id))?;
        let response = self.update_post_request(id, changes).send().await?;
        self.read_json(response).await
    }

    /// Multipart upload with the image in the `file` field
    pub fn upload_request(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<RequestBuilder> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        Ok(self.request(Method::POST, "/blogs/upload").multipart(form))
    }

    /// Uploads an image and returns its relative URL (`/uploads/<name>`)
    pub async fn upload_image(
        &mut self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        self.session.require_auth("/blogs/create")?;
        let response = self
            .upload_request(file_name, content_type, data)?
            .send()
            .await?;
        let uploaded: UploadResponse = self.read_json(response).await?;
        Ok(uploaded.url)
    }

    pub async fn delete_post(&mut self, id: &str) -> Result<()> {
        self.session.require_auth(&format!("/blogs/{}", id))?;
        let response = self
            .request(Method::DELETE, &format!("/blogs/{}", id))
            .send()
            .await?;
        self.check_status(response).await.map(|_| ())
    }

    async fn read_json<T: DeserializeOwned>(&mut self, response: Response) -> Result<T> {
        let response = self.check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Maps error statuses to `ClientError`; a 401 also invalidates the session
    async fn check_status(&mut self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate()?;
            return Err(ClientError::Unauthorized);
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
