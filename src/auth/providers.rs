//! OAuth provider strategies
//!
//! Each [`Provider`] variant supplies exactly two things: how to build the
//! authorize redirect, and how to turn a callback `code` into a normalized
//! [`ProviderProfile`]. Everything after that (reconciliation, tokens) is
//! provider-agnostic and lives in [`super::service`].

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use super::models::{Provider, ProviderProfile};
use crate::common::config::{AppConfig, ProviderCredentials};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v18.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v18.0/oauth/access_token";
const FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/v18.0/me";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} login is not configured")]
    NotConfigured(Provider),

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("profile request failed: {0}")]
    ProfileFailed(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Provider {
    pub fn scope(&self) -> &'static str {
        match self {
            Provider::Google => "openid email profile",
            Provider::Facebook => "email",
        }
    }

    /// Looks up this provider's client credentials
    pub fn credentials<'a>(
        &self,
        config: &'a AppConfig,
    ) -> Result<&'a ProviderCredentials, ProviderError> {
        let credentials = match self {
            Provider::Google => config.google.as_ref(),
            Provider::Facebook => config.facebook.as_ref(),
        };
        credentials.ok_or(ProviderError::NotConfigured(*self))
    }

    /// Callback URL registered with the provider
    pub fn callback_url(&self, backend_url: &str) -> String {
        format!("{}/api/auth/{}/callback", backend_url, self.as_str())
    }

    /// URL the browser is redirected to when a login starts
    pub fn authorize_url(&self, credentials: &ProviderCredentials, callback_url: &str) -> String {
        let base = match self {
            Provider::Google => GOOGLE_AUTHORIZE_URL,
            Provider::Facebook => FACEBOOK_AUTHORIZE_URL,
        };

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            base,
            urlencoding::encode(&credentials.client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(self.scope())
        )
    }

    /// Exchanges the callback code and reads the signed-in user's profile
    pub async fn fetch_profile(
        &self,
        http: &Client,
        credentials: &ProviderCredentials,
        code: &str,
        callback_url: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        let access_token = self
            .exchange_code(http, credentials, code, callback_url)
            .await?;

        let request = match self {
            Provider::Google => http.get(GOOGLE_USERINFO_URL).bearer_auth(&access_token),
            Provider::Facebook => http.get(FACEBOOK_PROFILE_URL).query(&[
                ("fields", "id,email,first_name,last_name,picture.type(large)"),
                ("access_token", access_token.as_str()),
            ]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::ProfileFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(provider = %self, http_status = %status, "Provider profile request rejected");
            return Err(ProviderError::ProfileFailed(format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        self.normalize_profile(&body)
    }

    async fn exchange_code(
        &self,
        http: &Client,
        credentials: &ProviderCredentials,
        code: &str,
        callback_url: &str,
    ) -> Result<String, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", callback_url),
            ("grant_type", "authorization_code"),
        ];

        debug!(provider = %self, "Exchanging authorization code for tokens");

        let request = match self {
            Provider::Google => http.post(GOOGLE_TOKEN_URL).form(&params),
            Provider::Facebook => http.get(FACEBOOK_TOKEN_URL).query(&params),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::ExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(provider = %self, status = %status, error = %error_text, "Token exchange failed");
            return Err(ProviderError::ExchangeFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(token.access_token)
    }

    /// Maps a provider's user info JSON onto [`ProviderProfile`]
    pub fn normalize_profile(&self, body: &Value) -> Result<ProviderProfile, ProviderError> {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match self {
            Provider::Google => {
                let provider_id = text("sub")
                    .or_else(|| text("id"))
                    .ok_or_else(|| ProviderError::Malformed("missing subject id".to_string()))?;

                Ok(ProviderProfile {
                    email: text("email"),
                    first_name: text("given_name"),
                    last_name: text("family_name"),
                    picture: text("picture"),
                    provider_id,
                })
            }
            Provider::Facebook => {
                let provider_id = text("id")
                    .ok_or_else(|| ProviderError::Malformed("missing user id".to_string()))?;

                let picture = body
                    .pointer("/picture/data/url")
                    .and_then(Value::as_str)
                    .map(str::to_string);

                Ok(ProviderProfile {
                    email: text("email"),
                    first_name: text("first_name"),
                    last_name: text("last_name"),
                    picture,
                    provider_id,
                })
            }
        }
    }
}
