use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AuthUser;

/// `iss` claim of every application token.
pub const TOKEN_ISSUER: &str = "universal-knowledge-chatbot";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Claims of the application access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub fn user(&self) -> AuthUser {
        AuthUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            email_verified: self.email_verified,
        }
    }
}

/// Claims of the OAuth `state` parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateClaims {
    pub nonce: String,
    pub return_to: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier for access tokens and OAuth state tokens. The two
/// token kinds use different secrets so one can never pass as the other.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    state_encoding: EncodingKey,
    state_decoding: DecodingKey,
    access_ttl: Duration,
    state_ttl: Duration,
}

impl TokenService {
    pub fn new(
        jwt_secret: &str,
        session_secret: &str,
        access_ttl_hours: i64,
        state_ttl_minutes: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            state_encoding: EncodingKey::from_secret(session_secret.as_bytes()),
            state_decoding: DecodingKey::from_secret(session_secret.as_bytes()),
            access_ttl: Duration::hours(access_ttl_hours),
            state_ttl: Duration::minutes(state_ttl_minutes),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Mint an application token for `user`.
    pub fn issue_access_token(&self, user: &AuthUser) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.clone(),
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            email_verified: user.email_verified,
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        let data = decode::<AccessClaims>(token, &self.access_decoding, &validation)?;
        Ok(data.claims)
    }

    /// Signed, short-lived `state` carrying a fresh nonce and the return URL.
    pub fn issue_state(&self, return_to: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = StateClaims {
            nonce: Uuid::new_v4().to_string(),
            return_to: return_to.to_string(),
            iat: now.timestamp(),
            exp: (now + self.state_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.state_encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify_state(&self, state: &str) -> Result<StateClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<StateClaims>(state, &self.state_decoding, &validation)?;
        Ok(data.claims)
    }
}
