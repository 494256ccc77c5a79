//! Identity reconciliation and credential validation

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use super::models::{AuthResponse, Provider, ProviderProfile, User, UserProjection};
use super::token::{decode_token, issue_token};
use crate::common::helpers::format_timestamp;
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState, ValidationResult};

pub struct IdentityService {
    db: SqlitePool,
    jwt_secret: String,
    token_ttl: Duration,
}

impl IdentityService {
    pub fn new(db: SqlitePool, jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.jwt_secret.clone(),
            Duration::hours(state.config.jwt_ttl_hours),
        )
    }

    /// Creates or refreshes the user keyed by the profile's email, then issues a credential
    pub async fn social_login(
        &self,
        provider: Provider,
        profile: &ProviderProfile,
    ) -> Result<AuthResponse, ApiError> {
        self.social_login_at(provider, profile, Utc::now()).await
    }

    pub async fn social_login_at(
        &self,
        provider: Provider,
        profile: &ProviderProfile,
        now: DateTime<Utc>,
    ) -> Result<AuthResponse, ApiError> {
        let email = match profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            Some(email) => email.to_lowercase(),
            None => {
                warn!(provider = %provider, provider_id = %profile.provider_id, "Provider profile has no email");
                let mut result = ValidationResult::new();
                result.add_error("email", "Email is required");
                return Err(result.into());
            }
        };

        info!(
            provider = %provider,
            email = %safe_email_log(&email),
            "Processing social login"
        );

        let user = self.upsert_user(provider, &email, profile, now).await?;
        let access_token = issue_token(&self.jwt_secret, self.token_ttl, &user, now)?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            provider = %provider,
            "Social login successful"
        );

        Ok(AuthResponse {
            access_token,
            user: user.into(),
        })
    }

    /// One statement keyed on the unique email column, so concurrent first
    /// logins with the same email converge on a single row.
    async fn upsert_user(
        &self,
        provider: Provider,
        email: &str,
        profile: &ProviderProfile,
        now: DateTime<Utc>,
    ) -> Result<User, ApiError> {
        let timestamp = format_timestamp(now);
        let name = profile
            .display_name()
            .or_else(|| email.split('@').next().map(str::to_string));

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, avatar, provider, provider_id, last_login_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name = COALESCE(excluded.name, users.name),
                avatar = COALESCE(excluded.avatar, users.avatar),
                provider = excluded.provider,
                provider_id = excluded.provider_id,
                last_login_at = excluded.last_login_at,
                updated_at = excluded.updated_at
            RETURNING id, email, name, avatar, provider, provider_id, last_login_at, created_at, updated_at
            "#,
        )
        .bind(generate_user_id())
        .bind(email)
        .bind(name.as_deref())
        .bind(profile.picture.as_deref())
        .bind(provider.as_str())
        .bind(&profile.provider_id)
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(&timestamp)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                provider = %provider,
                email = %safe_email_log(email),
                "Social login failed while reconciling user"
            );
            ApiError::DatabaseError(e)
        })
    }

    /// Verifies the credential and re-reads the user it names
    pub async fn validate_token(&self, token: &str) -> Result<UserProjection, ApiError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        match self.find_projection(&claims.sub).await? {
            Some(user) => {
                debug!(user_id = %user.id, "Credential validated");
                Ok(user)
            }
            None => {
                warn!(user_id = %claims.sub, "Credential names a user that no longer exists");
                Err(ApiError::Unauthorized("User not found".to_string()))
            }
        }
    }

    pub async fn find_projection(&self, user_id: &str) -> Result<Option<UserProjection>, ApiError> {
        sqlx::query_as::<_, UserProjection>(
            r#"
            SELECT id, email, COALESCE(name, '') AS name, COALESCE(avatar, '') AS avatar,
                   provider, last_login_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Database error during user lookup");
            ApiError::DatabaseError(e)
        })
    }
}
