// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::path::PathBuf;

use super::config::AppConfig;

/// Application state containing database pool, HTTP client, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub uploads_dir: PathBuf,
    pub http: Client,
    pub jwt_secret: String,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: SqlitePool, http: Client, config: AppConfig) -> Self {
        Self {
            db,
            uploads_dir: config.uploads_dir.clone(),
            http,
            jwt_secret: config.jwt_secret.clone(),
            config,
        }
    }
}
