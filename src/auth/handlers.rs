//! Authentication handlers

use axum::{
    extract::{Extension, Json, Path, Query},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Redirect,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::{bearer_token, AuthedUser};
use super::models::{AuthResponse, CallbackParams, MessageResponse, Provider, UserProjection};
use super::service::IdentityService;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

const LOGIN_FAILED: &str = "Authentication failed";

fn parse_provider(raw: &str) -> Result<Provider, ApiError> {
    raw.parse::<Provider>().map_err(|e| {
        warn!(provider = %raw, "Login requested for unknown provider");
        ApiError::NotFound(e)
    })
}

/// GET /api/auth/:provider
/// Redirects the browser to the provider's consent page
pub async fn login_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;
    let state = state_lock.read().await;

    let credentials = provider.credentials(&state.config).map_err(|e| {
        warn!(provider = %provider, "Login attempted for unconfigured provider");
        ApiError::ServiceUnavailable(e.to_string())
    })?;

    let callback_url = provider.callback_url(&state.config.backend_url);
    info!(provider = %provider, callback_url = %callback_url, "Initiating provider login");

    Ok(Redirect::temporary(
        &provider.authorize_url(credentials, &callback_url),
    ))
}

/// GET /api/auth/:provider/callback
/// Finishes the provider login and sends the browser back to the frontend,
/// carrying either `token` + `user` or `error` in the query string.
pub async fn oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;
    let state = state_lock.read().await.clone();
    info!(provider = %provider, "Received provider callback");

    let target = match complete_login(&state, provider, params).await {
        Ok(auth) => success_redirect(&state.config.frontend_url, &auth)?,
        Err(e) => {
            error!(provider = %provider, error = %e, "Provider authentication failed");
            failure_redirect(&state.config.frontend_url)
        }
    };

    Ok(Redirect::to(&target))
}

async fn complete_login(
    state: &AppState,
    provider: Provider,
    params: CallbackParams,
) -> Result<AuthResponse, ApiError> {
    if let Some(oauth_error) = params.error {
        return Err(ApiError::Unauthorized(format!(
            "provider returned error: {} {}",
            oauth_error,
            params.error_description.unwrap_or_default()
        )));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No authorization code provided".to_string()))?;

    let credentials = provider
        .credentials(&state.config)
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    let callback_url = provider.callback_url(&state.config.backend_url);
    let profile = provider
        .fetch_profile(&state.http, credentials, &code, &callback_url)
        .await
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    IdentityService::from_state(state)
        .social_login(provider, &profile)
        .await
}

/// Frontend login URL carrying the credential and the JSON-encoded user
pub fn success_redirect(frontend_url: &str, auth: &AuthResponse) -> Result<String, ApiError> {
    let user_json = serde_json::to_string(&auth.user).map_err(|e| {
        error!(error = %e, "Failed to serialize user projection");
        ApiError::InternalServer("serialization error".to_string())
    })?;

    Ok(format!(
        "{}/login?token={}&user={}",
        frontend_url,
        urlencoding::encode(&auth.access_token),
        urlencoding::encode(&user_json)
    ))
}

pub fn failure_redirect(frontend_url: &str) -> String {
    format!(
        "{}/login?error={}",
        frontend_url,
        urlencoding::encode(LOGIN_FAILED)
    )
}

/// GET /api/auth/validate
/// Returns the current user for a bearer credential
pub async fn validate_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Result<Json<UserProjection>, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::Unauthorized("missing auth".to_string()))?;

    let state = state_lock.read().await.clone();
    let user = IdentityService::from_state(&state)
        .validate_token(token)
        .await
        .map_err(|e| {
            warn!(token = %safe_token_log(token), error = %e, "Token validation failed");
            e
        })?;

    Ok(Json(user))
}

/// POST /api/auth/logout
/// Credentials are stateless, so the client discards its copy; this only acknowledges
pub async fn logout_handler(authed: AuthedUser) -> Json<MessageResponse> {
    info!(
        user_id = %authed.id,
        email = %safe_email_log(&authed.email),
        provider = %authed.provider,
        "User logout"
    );
    Json(MessageResponse {
        message: "Logout successful".to_string(),
    })
}
