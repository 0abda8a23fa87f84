//! Deterministic first-match routing of a chat turn. Never calls the model.

use tracing::info;

use super::state::{ConversationState, RoutingMetadata, SelectedNode};
use crate::models::chat::now_timestamp;

pub const WEATHER_KEYWORDS: [&str; 10] = [
    "weather",
    "temperature",
    "forecast",
    "rain",
    "sunny",
    "cloudy",
    "humidity",
    "wind",
    "hot",
    "cold",
];

pub const REASON_DOCUMENT: &str = "Document query with fileId";
pub const REASON_WEATHER: &str = "Weather-related query detected";
pub const REASON_UNSUPPORTED: &str = "Query not supported";
pub const UNSUPPORTED_MESSAGE: &str =
    "I can only help with weather queries or questions about uploaded documents.";

pub fn is_weather_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Decide the handling path for `state` and return the updated state.
pub fn route(mut state: ConversationState) -> ConversationState {
    let has_file = state
        .file_id
        .as_deref()
        .is_some_and(|f| !f.trim().is_empty());

    let (node, reason, message) = if has_file {
        (SelectedNode::Document, REASON_DOCUMENT, None)
    } else if is_weather_query(&state.user_query) {
        (SelectedNode::Weather, REASON_WEATHER, None)
    } else {
        (
            SelectedNode::Unsupported,
            REASON_UNSUPPORTED,
            Some(UNSUPPORTED_MESSAGE.to_string()),
        )
    };

    info!(
        conversation_id = %state.conversation_id,
        node = ?node,
        reason,
        "Routed query"
    );

    state.selected_node = node;
    state.routing_metadata = Some(RoutingMetadata {
        timestamp: now_timestamp(),
        reason: reason.to_string(),
        message,
    });
    state
}
