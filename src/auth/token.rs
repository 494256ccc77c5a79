//! Signed access credentials (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{error, warn};

use super::models::{Claims, Provider, User};
use crate::common::ApiError;

/// Signs a credential for `user`, valid for `ttl` from `now`
pub fn issue_token(
    secret: &str,
    ttl: Duration,
    user: &User,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let provider: Provider = user.provider.parse().map_err(|e: String| {
        error!(user_id = %user.id, error = %e, "Stored user has an unknown provider");
        ApiError::InternalServer("jwt error".to_string())
    })?;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        provider,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user.id, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}

/// Checks signature and expiry, returning the embedded claims
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("Invalid token".to_string())
    })
}
