use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use validator::ValidationErrors;

use crate::orchestrator::AgentError;
use crate::services::token_service::TokenError;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Every failure an HTTP handler can report.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    DomainNotAllowed(String),
    #[error("{0}")]
    NotFound(String),
    /// A dependency failed. `details` is only filled in development.
    #[error("{context}: {message}")]
    Upstream {
        context: String,
        message: String,
        details: Option<String>,
    },
    #[error("Agent exceeded the recursion limit of {0} tool round trips")]
    RecursionLimitExceeded(usize),
    #[error("Too many requests from this IP, please try again later.")]
    RateLimited { retry_after_secs: u64 },
}

impl ApiError {
    pub fn upstream(context: &str, err: impl std::fmt::Display, development: bool) -> Self {
        let message = err.to_string();
        ApiError::Upstream {
            context: context.to_string(),
            details: development.then(|| message.clone()),
            message,
        }
    }

    pub fn from_agent(err: AgentError, development: bool) -> Self {
        match err {
            AgentError::RecursionLimitExceeded { limit } => ApiError::RecursionLimitExceeded(limit),
            other => ApiError::upstream("Failed to process chat message", other, development),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::DomainNotAllowed(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::RecursionLimitExceeded(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Validation(msg) | ApiError::NotFound(msg) => {
                json!({ "success": false, "error": msg })
            }
            ApiError::Authentication(msg) => json!({
                "success": false,
                "authenticated": false,
                "error": "Authentication required",
                "message": msg,
            }),
            ApiError::DomainNotAllowed(msg) => json!({
                "success": false,
                "error": "Access denied",
                "message": msg,
            }),
            ApiError::Upstream {
                context,
                message,
                details,
            } => {
                let mut body = json!({ "success": false, "error": context, "message": message });
                if let Some(details) = details {
                    body["details"] = json!(details);
                }
                body
            }
            ApiError::RecursionLimitExceeded(_) => json!({
                "success": false,
                "error": "Failed to process chat message",
                "message": self.to_string(),
            }),
            ApiError::RateLimited { retry_after_secs } => json!({
                "success": false,
                "error": RATE_LIMIT_MESSAGE,
                "retryAfter": retry_after_secs,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let mut response = (status, Json(self.body())).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(first_validation_message(&errors))
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Authentication("Token expired".to_string()),
            TokenError::Invalid(_) => ApiError::Authentication("Invalid token".to_string()),
            TokenError::Signing(e) => ApiError::Upstream {
                context: "Failed to issue token".to_string(),
                message: e,
                details: None,
            },
        }
    }
}

/// Human-readable message of the first failed rule, falling back to the
/// validator's own rendering.
pub fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
