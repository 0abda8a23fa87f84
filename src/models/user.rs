use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User id recorded when a request carries no identity.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Authenticated user, as carried inside the application token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
}

/// Profile returned by the identity provider's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl ProviderProfile {
    pub fn into_user(self) -> AuthUser {
        let email = self.email.unwrap_or_default();
        let name = self
            .name
            .or(self.nickname)
            .unwrap_or_else(|| email.clone());
        AuthUser {
            id: self.sub,
            email,
            name,
            email_verified: self.email_verified,
        }
    }
}
