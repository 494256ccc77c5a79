//! Persisted login session
//!
//! The session file is a flat string map standing in for browser storage:
//!
//! ```json
//! {
//!   "auth_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
//!   "user": "{\"id\":\"U...\",\"email\":\"t@example.com\",...}",
//!   "redirectUrl": "/blogs/mine"
//! }
//! ```
//!
//! The current user is published through a `watch` channel. Only
//! [`SessionStore::complete_login`], [`SessionStore::refresh_user`],
//! [`SessionStore::logout`] and [`SessionStore::invalidate`] change it.

use reqwest::Url;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::models::SessionUser;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user";
pub const REDIRECT_KEY: &str = "redirectUrl";

/// Where the app lands after login when no protected route was attempted
pub const DEFAULT_LANDING: &str = "/blogs";

const UNGUARDED_ROUTES: [&str; 2] = ["/login", "/login/callback"];

pub struct SessionStore {
    file_path: PathBuf,
    entries: BTreeMap<String, String>,
    user_tx: watch::Sender<Option<SessionUser>>,
}

impl SessionStore {
    /// `BLOGCLI_SESSION`, else `~/.blogcli/session.json`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("BLOGCLI_SESSION") {
            return PathBuf::from(path);
        }

        match home::home_dir() {
            Some(home_dir) => home_dir.join(".blogcli").join("session.json"),
            None => PathBuf::from(".blogcli").join("session.json"),
        }
    }

    /// Opens the session file and restores the session when it is well formed.
    /// A token without a valid user (or the reverse) clears both.
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let (user_tx, _) = watch::channel(None);
        let mut store = Self {
            entries: load_entries(&file_path),
            file_path,
            user_tx,
        };

        match store.stored_user() {
            Some(user) if store.token().is_some() => {
                debug!(user_id = %user.id, "Restored session");
                store.user_tx.send_replace(Some(user));
            }
            _ => store.clear()?,
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.user_tx.subscribe()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.user_tx.borrow().clone()
    }

    pub fn token(&self) -> Option<&str> {
        self.entries
            .get(TOKEN_KEY)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Finishes a login from the frontend callback URL (`/login?token=..&user=..`
    /// or `/login?error=..`). Relative URLs are accepted.
    pub fn complete_login(&mut self, callback_url: &str) -> Result<SessionUser> {
        let url = parse_callback_url(callback_url)?;

        let mut token = None;
        let mut user_param = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "error" => return Err(ClientError::AuthFailed(value.into_owned())),
                "token" => token = Some(value.into_owned()),
                "user" => user_param = Some(value.into_owned()),
                _ => {}
            }
        }

        let (token, user_param) = match (token, user_param) {
            (Some(t), Some(u)) if !t.is_empty() && !u.is_empty() => (t, u),
            _ => {
                return Err(ClientError::InvalidCallback(
                    "missing token or user".to_string(),
                ))
            }
        };

        // The user JSON may arrive percent-encoded a second time
        let user_json = if user_param.starts_with('%') {
            urlencoding::decode(&user_param)
                .map_err(|_| ClientError::InvalidCallback("malformed user encoding".to_string()))?
                .into_owned()
        } else {
            user_param
        };

        let user: SessionUser = serde_json::from_str(&user_json)
            .map_err(|e| ClientError::InvalidCallback(format!("invalid user data: {}", e)))?;

        self.entries.insert(TOKEN_KEY.to_string(), token);
        self.entries
            .insert(USER_KEY.to_string(), serde_json::to_string(&user)?);
        self.save()?;
        self.user_tx.send_replace(Some(user.clone()));

        info!(user_id = %user.id, provider = %user.provider, "Logged in");
        Ok(user)
    }

    /// Replaces the cached profile with the one the API just confirmed.
    /// Without a stored credential there is nothing to refresh.
    pub fn refresh_user(&mut self, user: SessionUser) -> Result<()> {
        if !self.is_authenticated() {
            return Ok(());
        }

        if self.current_user().as_ref() != Some(&user) {
            self.entries
                .insert(USER_KEY.to_string(), serde_json::to_string(&user)?);
            self.save()?;
            debug!(user_id = %user.id, "Refreshed cached user");
        }
        self.user_tx.send_replace(Some(user));
        Ok(())
    }

    /// User-initiated sign out
    pub fn logout(&mut self) -> Result<()> {
        info!("Logged out");
        self.clear()
    }

    /// The API rejected the stored credential
    pub fn invalidate(&mut self) -> Result<()> {
        warn!("Stored credential rejected, clearing session");
        self.clear()
    }

    /// Route guard for protected views. Without a credential the attempted
    /// route is remembered for after login.
    pub fn require_auth(&mut self, attempted: &str) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }

        if !UNGUARDED_ROUTES.contains(&attempted) {
            self.entries
                .insert(REDIRECT_KEY.to_string(), attempted.to_string());
            self.save()?;
        }

        Err(ClientError::LoginRequired)
    }

    /// Route to continue at after login; consumes the remembered one
    pub fn take_redirect(&mut self) -> Result<String> {
        match self.entries.remove(REDIRECT_KEY) {
            Some(route) => {
                self.save()?;
                Ok(route)
            }
            None => Ok(DEFAULT_LANDING.to_string()),
        }
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.entries.get(REDIRECT_KEY).map(String::as_str)
    }

    fn stored_user(&self) -> Option<SessionUser> {
        let raw = self.entries.get(USER_KEY)?;
        match serde_json::from_str(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user is malformed");
                None
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        let had_session =
            self.entries.remove(TOKEN_KEY).is_some() | self.entries.remove(USER_KEY).is_some();
        if had_session {
            self.save()?;
        }
        self.user_tx.send_replace(None);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.file_path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

/// Missing or unreadable session files start empty
fn load_entries(file_path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(file_path) {
        Ok(contents) => contents,
        Err(_) => return BTreeMap::new(),
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(path = %file_path.display(), error = %e, "Session file is corrupted, starting empty");
        BTreeMap::new()
    })
}

fn parse_callback_url(callback_url: &str) -> Result<Url> {
    let invalid = |_| ClientError::InvalidCallback("unparseable callback URL".to_string());
    match Url::parse(callback_url) {
        Ok(url) => Ok(url),
        Err(_) => Url::parse("http://localhost/")
            .and_then(|base| base.join(callback_url))
            .map_err(invalid),
    }
}
