//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Identity providers a user can sign in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// Internal user id
    pub sub: String,
    pub email: String,
    pub provider: Provider,
    pub iat: usize,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub provider: String,
    pub provider_id: Option<String>,
    pub last_login_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Redacted view of a user handed to clients
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProjection {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub provider: String,
    pub last_login_at: String,
}

impl From<User> for UserProjection {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name.unwrap_or_default(),
            avatar: user.avatar.unwrap_or_default(),
            provider: user.provider,
            last_login_at: user.last_login_at,
        }
    }
}

/// Profile returned by a provider callback, normalized across providers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderProfile {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
    pub provider_id: String,
}

impl ProviderProfile {
    /// "First Last" from whichever name parts are present
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Result of a successful provider login
#[derive(Serialize, Debug, Clone)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserProjection,
}

/// Query string a provider sends back to the callback endpoint
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}
