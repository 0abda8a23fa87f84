use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::{auth_routes, chat, docs::ApiDoc, dto::HealthResponse, files, upload, webhook};
use super::rate_limiter::{rate_limit_middleware, RateLimiter};
use crate::auth::WEBHOOK_KEY_HEADER;
use crate::config::Config;
use crate::models::chat::now_timestamp;
use crate::orchestrator::ChatOrchestrator;
use crate::services::identity_provider::{DomainPolicy, IdentityProvider};
use crate::services::{DocumentIngestor, KnowledgeIngestor, TokenService};
use crate::storage::FileRepository;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Clients and settings shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub ingestor: Arc<DocumentIngestor>,
    pub files: Arc<FileRepository>,
    pub knowledge: Arc<KnowledgeIngestor>,
    pub tokens: Arc<TokenService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub domain_policy: DomainPolicy,
    pub rate_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn development(&self) -> bool {
        self.config.is_development()
    }
}

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", get(auth_routes::login))
        .route("/api/auth/callback", get(auth_routes::callback))
        .route("/api/auth/user", get(auth_routes::current_user))
        .route("/api/auth/status", get(auth_routes::status))
        .route("/api/auth/logout", post(auth_routes::logout))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files", get(files::list_files))
        .route("/api/files/{file_id}", get(files::get_file))
        .route("/api/files/{file_id}", delete(files::delete_file))
        .route("/api/external/webhook", post(webhook::receive))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured frontend origins
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .effective_allowed_origins()
        .iter()
        .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(WEBHOOK_KEY_HEADER),
        ])
        .allow_credentials(true)
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "healthy".to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: now_timestamp(),
        environment: state.config.environment.clone(),
    })
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    let body = json!({
        "success": false,
        "message": format!("Route {} not found", uri.path()),
    });
    (StatusCode::NOT_FOUND, Json(body))
}
