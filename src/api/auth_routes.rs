//! OAuth login through the identity provider.
//!
//! The `state` parameter is a short-lived signed token, so the flow needs no
//! server-side session. On success the application token is set as an
//! HTTP-only cookie and, when `redirect_token_fallback` is on, also appended
//! to the redirect URL for frontends that cannot read cross-site cookies.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use reqwest::Url;
use tracing::{info, warn};

use super::dto::{
    AuthStatusResponse, CallbackQuery, DomainRestrictions, LoginQuery, LoginResponse,
    LogoutResponse, UserResponse,
};
use super::error::ApiError;
use super::routes::AppState;
use crate::auth::{CurrentUser, OptionalUser};
use crate::config::Config;

/// 302 to `url`
fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

fn origin_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.origin().ascii_serialization())
}

/// `return_to` when it points at an allowed origin, the frontend URL otherwise.
pub fn safe_return_to(config: &Config, return_to: Option<&str>) -> String {
    let Some(candidate) = return_to.map(str::trim).filter(|r| !r.is_empty()) else {
        return config.frontend_url.clone();
    };
    let allowed: Vec<String> = config
        .effective_allowed_origins()
        .iter()
        .chain(std::iter::once(&config.frontend_url))
        .filter_map(|o| origin_of(o))
        .collect();

    match origin_of(candidate) {
        Some(origin) if allowed.contains(&origin) => candidate.to_string(),
        _ => {
            warn!(return_to = candidate, "Rejected returnTo outside allowed origins");
            config.frontend_url.clone()
        }
    }
}

/// `<frontend_url>/login?error=<code>[&message=<message>]`
pub fn login_error_url(config: &Config, code: &str, message: Option<&str>) -> String {
    let base = format!("{}/login", config.frontend_url.trim_end_matches('/'));
    match Url::parse(&base) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("error", code);
                if let Some(message) = message {
                    query.append_pair("message", message);
                }
            }
            url.to_string()
        }
        Err(_) => format!("{}?error={}", base, code),
    }
}

fn success_url(return_to: &str, token: Option<&str>) -> String {
    match Url::parse(return_to) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("auth", "success");
                if let Some(token) = token {
                    query.append_pair("token", token);
                }
            }
            url.to_string()
        }
        Err(_) => return_to.to_string(),
    }
}

fn auth_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut builder = Cookie::build((config.auth_cookie_name.clone(), token))
        .http_only(true)
        .path("/")
        .secure(config.cookie_secure)
        // Cross-site frontends need SameSite=None, which browsers only accept with Secure
        .same_site(if config.cookie_secure { SameSite::None } else { SameSite::Lax })
        .max_age(time::Duration::hours(config.jwt_expiry_hours));
    if let Some(domain) = config.cookie_domain.clone().filter(|d| !d.is_empty()) {
        builder = builder.domain(domain);
    }
    builder.build()
}

#[utoipa::path(
    get,
    path = "/api/auth/login",
    params(LoginQuery),
    responses((status = 200, description = "Identity provider URL to redirect to", body = LoginResponse))
)]
pub async fn login(
    State(state): State<AppState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Query(query) = query?;
    let return_to = safe_return_to(&state.config, query.return_to.as_deref());

    let state_token = state.tokens.issue_state(&return_to)?;
    let login_url = state
        .identity
        .authorize_url(&state_token, &state.config.auth_callback_url())
        .map_err(|e| ApiError::upstream("Failed to initiate login", e, state.development()))?;

    Ok(Json(LoginResponse {
        success: true,
        login_url,
        message: "Redirect to this URL to login with Google".to_string(),
    }))
}

/// Always answers with a redirect; failures land on the frontend login page.
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(CallbackQuery),
    responses((status = 302, description = "Redirect to the frontend with `auth=success` or `error=<code>`"))
)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> (CookieJar, Response) {
    let config = &state.config;

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed OAuth callback query");
            return (jar, found(&login_error_url(config, "callback_failed", None)));
        }
    };

    if let Some(error) = query.error.as_deref() {
        warn!(error, "Identity provider reported an error");
        let message = query.error_description.as_deref().unwrap_or(error);
        return (jar, found(&login_error_url(config, "auth_failed", Some(message))));
    }

    let claims = match query.state.as_deref().map(|s| state.tokens.verify_state(s)) {
        Some(Ok(claims)) => claims,
        _ => {
            warn!("Invalid or expired OAuth state");
            let url = login_error_url(
                config,
                "invalid_state",
                Some("Authentication state expired, please try again"),
            );
            return (jar, found(&url));
        }
    };

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("No authorization code received");
        return (jar, found(&login_error_url(config, "no_code", None)));
    };

    let redirect_uri = config.auth_callback_url();
    let profile = match state.identity.exchange_code(code, &redirect_uri).await {
        Ok(provider_token) => state.identity.user_profile(&provider_token).await,
        Err(e) => Err(e),
    };
    let user = match profile {
        Ok(profile) => profile.into_user(),
        Err(e) => {
            warn!(error = %e, "OAuth callback failed");
            let url = login_error_url(config, "callback_failed", Some(&e.to_string()));
            return (jar, found(&url));
        }
    };

    if !state.domain_policy.is_email_allowed(&user.email) {
        warn!(email = %user.email, "Login rejected by domain policy");
        let url = login_error_url(config, "access_denied", Some(&config.domain_block_message));
        return (jar, found(&url));
    }

    let token = match state.tokens.issue_access_token(&user) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Failed to issue access token");
            let url = login_error_url(config, "callback_failed", Some(&e.to_string()));
            return (jar, found(&url));
        }
    };

    info!(user_id = %user.id, email = %user.email, "User authenticated");
    let return_to = safe_return_to(config, Some(&claims.return_to));
    let fallback = config.redirect_token_fallback.then_some(token.as_str());
    let url = success_url(&return_to, fallback);
    let jar = jar.add(auth_cookie(config, token.clone()));
    (jar, found(&url))
}

#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "No valid credential", body = super::dto::ErrorResponse)
    )
)]
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        authenticated: true,
        user: Some(user),
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/status",
    responses((status = 200, description = "Authentication state and login policy", body = AuthStatusResponse))
)]
pub async fn status(State(state): State<AppState>, OptionalUser(user): OptionalUser) -> Json<AuthStatusResponse> {
    let policy = &state.domain_policy;
    Json(AuthStatusResponse {
        success: true,
        authenticated: user.is_some(),
        domain_restrictions: DomainRestrictions {
            enabled: policy.enabled,
            allowed_domains: policy.allowed_domains.clone(),
            allow_all_gmail: policy.allow_all_gmail,
        },
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    params(LoginQuery),
    responses(
        (status = 200, description = "Cookie cleared; identity provider logout URL", body = LogoutResponse),
        (status = 401, description = "No valid credential", body = super::dto::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    let Query(query) = query?;
    let config = &state.config;
    let default_target = format!("{}/logout", config.frontend_url.trim_end_matches('/'));
    let return_to = match query.return_to.as_deref() {
        Some(r) => safe_return_to(config, Some(r)),
        None => default_target,
    };

    let logout_url = state
        .identity
        .logout_url(&return_to)
        .map_err(|e| ApiError::upstream("Failed to logout", e, state.development()))?;

    info!(user_id = %user.id, "User logged out");
    let mut removal = Cookie::build((config.auth_cookie_name.clone(), "")).path("/");
    if let Some(domain) = config.cookie_domain.clone().filter(|d| !d.is_empty()) {
        removal = removal.domain(domain);
    }
    let jar = jar.remove(removal);

    Ok((
        jar,
        Json(LogoutResponse {
            success: true,
            logout_url,
            message: "Logged out successfully".to_string(),
        }),
    ))
}
