//! Request identity extractors.
//!
//! A request is authenticated by an application token, taken from the
//! `Authorization: Bearer` header or, failing that, from the HTTP-only auth
//! cookie set at the OAuth callback.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::models::{AuthUser, ANONYMOUS_USER};

/// Header carrying the shared secret of the webhook relay.
pub const WEBHOOK_KEY_HEADER: &str = "x-api-key";

/// Raw token from the bearer header or the auth cookie.
pub fn extract_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(cookie_name)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, ApiError> {
    let token = extract_token(parts, &state.config.auth_cookie_name)
        .ok_or_else(|| ApiError::Authentication("No authentication token provided".to_string()))?;
    let claims = state.tokens.verify_access_token(&token)?;
    Ok(claims.user())
}

/// Authenticated user; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(CurrentUser)
    }
}

/// Attaches the user when a valid token is present; never rejects.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(authenticate(parts, state).ok()))
    }
}

/// Identity for chat and file routes: required when `require_auth` is set,
/// otherwise optional with an anonymous fallback.
#[derive(Debug, Clone)]
pub struct RequestUser(pub Option<AuthUser>);

impl RequestUser {
    pub fn id(&self) -> &str {
        self.0.as_ref().map(|u| u.id.as_str()).unwrap_or(ANONYMOUS_USER)
    }
}

impl FromRequestParts<AppState> for RequestUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.config.require_auth {
            authenticate(parts, state).map(|u| RequestUser(Some(u)))
        } else {
            Ok(RequestUser(authenticate(parts, state).ok()))
        }
    }
}

/// Guard for the webhook route: the `X-API-Key` header must equal the
/// configured key. With no key configured every delivery is refused.
#[derive(Debug, Clone, Copy)]
pub struct WebhookKey;

impl FromRequestParts<AppState> for WebhookKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .webhook_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::Authentication("Webhook API key is not configured".to_string()))?;

        let provided = parts
            .headers
            .get(WEBHOOK_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("Missing API key".to_string()))?;

        if provided == expected {
            Ok(WebhookKey)
        } else {
            tracing::warn!("Webhook rejected: invalid API key");
            Err(ApiError::Authentication("Invalid API key".to_string()))
        }
    }
}
