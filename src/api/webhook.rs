use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{info, warn};

use super::dto::{WebhookRequest, WebhookResponse};
use super::error::ApiError;
use super::routes::AppState;
use crate::auth::WebhookKey;
use crate::services::knowledge_ingestion::{parse_webhook, KnowledgeError};

fn knowledge_error(err: KnowledgeError, development: bool) -> ApiError {
    match err {
        KnowledgeError::MissingData
        | KnowledgeError::UnknownSource(_)
        | KnowledgeError::InvalidPayload { .. } => ApiError::Validation(err.to_string()),
        other => ApiError::upstream("Failed to process webhook", other, development),
    }
}

#[utoipa::path(
    post,
    path = "/api/external/webhook",
    request_body = WebhookRequest,
    params(("x-api-key" = String, Header, description = "Shared webhook secret")),
    responses(
        (status = 200, description = "Items embedded and stored", body = WebhookResponse),
        (status = 400, description = "Missing Data or unknown Source", body = super::dto::ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = super::dto::ErrorResponse)
    )
)]
pub async fn receive(
    State(state): State<AppState>,
    _key: WebhookKey,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Json(req) = payload?;
    let source = req.source.unwrap_or_default();

    let items = parse_webhook(&source, req.data.as_ref()).map_err(|e| {
        warn!(source = %source, error = %e, "Rejected webhook payload");
        knowledge_error(e, state.development())
    })?;
    info!(source = %source, items = items.len(), "Webhook received");

    let report = state
        .knowledge
        .ingest(items)
        .await
        .map_err(|e| knowledge_error(e, state.development()))?;

    Ok(Json(WebhookResponse {
        success: true,
        message: format!("Stored {} item(s)", report.stored.len()),
        stored: report.stored.len(),
        failed: report.failed,
        ids: report.stored,
    }))
}
