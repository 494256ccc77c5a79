//! Shared fixtures for module tests

use chrono::Duration;
use reqwest::Client;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::{migrations, AppConfig, AppState};
use crate::auth::models::{AuthResponse, Provider, ProviderProfile};
use crate::auth::IdentityService;

pub const TEST_SECRET: &str = "test_secret_key";

/// Fresh in-memory database with the full schema
pub async fn setup_test_db() -> SqlitePool {
    // One connection: every sqlite::memory: connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    migrations::create_schema(&pool).await.unwrap();
    pool
}

pub fn test_state(pool: SqlitePool) -> AppState {
    AppState::new(pool, Client::new(), AppConfig::for_tests())
}

pub fn identity_service(pool: &SqlitePool) -> IdentityService {
    IdentityService::new(pool.clone(), TEST_SECRET.to_string(), Duration::hours(24))
}

pub fn profile(email: &str, first: &str, last: &str) -> ProviderProfile {
    ProviderProfile {
        email: Some(email.to_string()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        picture: Some(format!("https://img.example.com/{}.jpg", first)),
        provider_id: format!("google-{}", first),
    }
}

/// Signs in a Google user and returns the credential plus projection
pub async fn seed_user(pool: &SqlitePool, email: &str, first: &str, last: &str) -> AuthResponse {
    identity_service(pool)
        .social_login(Provider::Google, &profile(email, first, last))
        .await
        .unwrap()
}
