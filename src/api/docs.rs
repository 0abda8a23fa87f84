use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::{auth_routes, chat, dto, files, routes, upload, webhook};
use crate::models::document::{FileDetails, FileSummary};
use crate::models::AuthUser;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health,
        auth_routes::login,
        auth_routes::callback,
        auth_routes::current_user,
        auth_routes::status,
        auth_routes::logout,
        chat::chat,
        upload::upload_file,
        files::list_files,
        files::get_file,
        files::delete_file,
        webhook::receive,
    ),
    components(
        schemas(
            dto::ChatRequest,
            dto::ChatResponse,
            dto::ChatData,
            dto::ChatMetadata,
            dto::ChatUser,
            dto::UploadForm,
            dto::UploadResponse,
            dto::UploadData,
            dto::FileListResponse,
            dto::FileResponse,
            dto::MessageResponse,
            dto::LoginResponse,
            dto::UserResponse,
            dto::AuthStatusResponse,
            dto::DomainRestrictions,
            dto::LogoutResponse,
            dto::WebhookRequest,
            dto::WebhookResponse,
            dto::HealthResponse,
            dto::ErrorResponse,
            AuthUser,
            FileSummary,
            FileDetails,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Chat", description = "Routed, tool-augmented chat"),
        (name = "Files", description = "Document upload and management"),
        (name = "Authentication", description = "OAuth login and session token"),
        (name = "Integrations", description = "Knowledge ingestion from Slack, Jira and GitHub"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "webhook_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
        }
    }
}
