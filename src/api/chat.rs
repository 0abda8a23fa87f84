use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{ChatData, ChatMetadata, ChatRequest, ChatResponse, ChatUser};
use super::error::ApiError;
use super::routes::AppState;
use crate::auth::RequestUser;
use crate::models::chat::now_timestamp;
use crate::orchestrator::ConversationState;

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Blank or oversized message", body = super::dto::ErrorResponse),
        (status = 401, description = "Authentication required", body = super::dto::ErrorResponse),
        (status = 500, description = "Agent or tool failure", body = super::dto::ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    user: RequestUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let conversation_id = req
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let file_id = req.file_id.filter(|f| !f.trim().is_empty());

    info!(
        conversation_id = %conversation_id,
        user_id = user.id(),
        has_file = file_id.is_some(),
        "Chat request"
    );

    let turn_state = ConversationState::new(conversation_id, req.message.trim(), file_id.clone());
    let turn = state
        .orchestrator
        .handle(turn_state, user.id())
        .await
        .map_err(|e| ApiError::from_agent(e, state.development()))?;

    Ok(Json(ChatResponse {
        success: true,
        data: ChatData {
            message: turn.answer,
            metadata: ChatMetadata {
                conversation_id: turn.conversation_id,
                timestamp: now_timestamp(),
                file_id,
            },
            user: ChatUser {
                id: user.id().to_string(),
            },
            tools_used: (!turn.tools_used.is_empty()).then_some(turn.tools_used),
        },
    }))
}
