use serde::Serialize;

use crate::models::Message;

/// Handling path chosen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectedNode {
    #[serde(rename = "unset")]
    Unset,
    #[serde(rename = "documentNode")]
    Document,
    #[serde(rename = "weatherNode")]
    Weather,
    #[serde(rename = "none")]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingMetadata {
    pub timestamp: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything known about one chat turn. Passed by value: the router and the
/// agent loop each take a state and hand back a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub conversation_id: String,
    /// Prior turns only; the system prompt and the new human message are
    /// added by the agent loop
    pub messages: Vec<Message>,
    pub user_query: String,
    pub file_id: Option<String>,
    pub selected_node: SelectedNode,
    pub routing_metadata: Option<RoutingMetadata>,
}

impl ConversationState {
    pub fn new(
        conversation_id: impl Into<String>,
        user_query: impl Into<String>,
        file_id: Option<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            user_query: user_query.into(),
            file_id: file_id.filter(|f| !f.trim().is_empty()),
            selected_node: SelectedNode::Unset,
            routing_metadata: None,
        }
    }

    pub fn with_history(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }
}
