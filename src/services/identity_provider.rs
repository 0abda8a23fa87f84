use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::models::user::ProviderProfile;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Identity provider error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Identity provider is not configured: {0}")]
    Misconfigured(String),
}

/// OAuth authorization-code identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's authorization endpoint for a login attempt.
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, IdentityError>;

    /// Exchange an authorization code for a provider access token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, IdentityError>;

    async fn user_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError>;

    fn logout_url(&self, return_to: &str) -> Result<String, IdentityError>;
}

#[derive(Debug, Clone)]
pub struct Auth0Settings {
    /// Tenant domain (`tenant.eu.auth0.com`) or a full base URL
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub connection: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct Auth0Client {
    client: reqwest::Client,
    base_url: String,
    settings: Auth0Settings,
}

impl Auth0Client {
    pub fn new(client: reqwest::Client, settings: Auth0Settings) -> Self {
        let domain = settings.domain.trim_end_matches('/');
        let base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Self {
            client,
            base_url,
            settings,
        }
    }

    fn url(&self, path: &str) -> Result<Url, IdentityError> {
        if self.settings.domain.is_empty() || self.settings.client_id.is_empty() {
            return Err(IdentityError::Misconfigured(
                "auth0_domain and auth0_client_id are required".to_string(),
            ));
        }
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| IdentityError::Misconfigured(e.to_string()))
    }

    async fn api_error(response: reqwest::Response) -> IdentityError {
        IdentityError::ApiError {
            status: response.status().as_u16(),
            message: response.text().await.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, IdentityError> {
        let mut url = self.url("/authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("scope", &self.settings.scope)
                .append_pair("state", state);
            if let Some(ref connection) = self.settings.connection {
                query.append_pair("connection", connection);
            }
        }
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, IdentityError> {
        let response = self
            .client
            .post(self.url("/oauth/token")?)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.access_token)
    }

    async fn user_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError> {
        let response = self
            .client
            .get(self.url("/userinfo")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.json().await?)
    }

    fn logout_url(&self, return_to: &str) -> Result<String, IdentityError> {
        let mut url = self.url("/v2/logout")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("returnTo", return_to);
        Ok(url.to_string())
    }
}

/// Login allowlist by email domain.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
    pub allow_all_gmail: bool,
}

impl DomainPolicy {
    pub fn is_email_allowed(&self, email: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        if self.allow_all_gmail && domain == "gmail.com" {
            return true;
        }
        if self.allowed_domains.is_empty() {
            return true;
        }
        self.allowed_domains
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&domain))
    }
}
