//! Runtime configuration read from environment variables (after `.env` is loaded)

use std::env;
use std::path::PathBuf;
use tracing::warn;

const DEV_JWT_SECRET: &str = "replace_with_strong_secret";

/// OAuth client credentials for one identity provider
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    fn from_env(id_key: &str, secret_key: &str) -> Option<Self> {
        let client_id = env::var(id_key).ok().filter(|v| !v.trim().is_empty())?;
        let client_secret = env::var(secret_key).ok().filter(|v| !v.trim().is_empty())?;
        Some(Self {
            client_id,
            client_secret,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Public base URL of this API, used to build provider callback URLs
    pub backend_url: String,
    /// Browser redirect target after a provider callback
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub uploads_dir: PathBuf,
    pub google: Option<ProviderCredentials>,
    pub facebook: Option<ProviderCredentials>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://blog_api.db".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development fallback secret");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);

        let backend_url = env::var("BACKEND_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:4200".to_string())
            .trim_end_matches('/')
            .to_string();

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .ok()
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![frontend_url.clone()]);

        let uploads_dir =
            PathBuf::from(env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()));

        Self {
            database_url,
            port,
            jwt_secret,
            jwt_ttl_hours,
            backend_url,
            frontend_url,
            cors_origins,
            uploads_dir,
            google: ProviderCredentials::from_env("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            facebook: ProviderCredentials::from_env("FACEBOOK_APP_ID", "FACEBOOK_APP_SECRET"),
        }
    }

    /// Configuration suitable for tests: in-memory database, no providers
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test_secret_key".to_string(),
            jwt_ttl_hours: 24,
            backend_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:4200".to_string(),
            cors_origins: vec!["http://localhost:4200".to_string()],
            uploads_dir: std::env::temp_dir().join(format!("blog_api_{}", uuid::Uuid::new_v4())),
            google: None,
            facebook: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
