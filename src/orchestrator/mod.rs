pub mod agent_loop;
pub mod prompts;
pub mod router;
pub mod state;

use tracing::info;

use crate::config::RoutingMode;
use crate::models::Message;
use crate::tools::{ToolContext, ToolKind};

pub use agent_loop::{AgentError, AgentLoop, AgentRun};
pub use state::{ConversationState, RoutingMetadata, SelectedNode};

/// Result of one chat turn, ready to be rendered by the HTTP layer.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub conversation_id: String,
    pub answer: String,
    pub tools_used: Vec<String>,
    pub selected_node: SelectedNode,
    pub routing: Option<RoutingMetadata>,
}

/// Routes a turn and, when the route calls for it, runs the agent with the
/// tools bound to that route.
pub struct ChatOrchestrator {
    agent: AgentLoop,
    routing_mode: RoutingMode,
}

impl ChatOrchestrator {
    pub fn new(agent: AgentLoop, routing_mode: RoutingMode) -> Self {
        Self {
            agent,
            routing_mode,
        }
    }

    /// Tools a node may use. `None` means the node answers without the model.
    pub fn node_tools(&self, node: SelectedNode) -> Option<Vec<ToolKind>> {
        match node {
            SelectedNode::Document => Some(vec![ToolKind::DocumentQa]),
            SelectedNode::Weather => Some(vec![ToolKind::WeatherLookup]),
            SelectedNode::Unsupported | SelectedNode::Unset => match self.routing_mode {
                RoutingMode::Strict => None,
                RoutingMode::Universal => Some(self.agent.registry().kinds()),
            },
        }
    }

    pub async fn handle(&self, state: ConversationState, user_id: &str) -> Result<ChatTurn, AgentError> {
        let state = router::route(state);
        let node = state.selected_node;
        let routing = state.routing_metadata.clone();

        let Some(bound) = self.node_tools(node) else {
            info!(conversation_id = %state.conversation_id, "Answering unsupported query without the model");
            let answer = routing
                .as_ref()
                .and_then(|r| r.message.clone())
                .unwrap_or_else(|| router::UNSUPPORTED_MESSAGE.to_string());
            return Ok(ChatTurn {
                conversation_id: state.conversation_id,
                answer,
                tools_used: Vec::new(),
                selected_node: node,
                routing,
            });
        };

        let human = match (node, state.file_id.as_deref()) {
            (SelectedNode::Document, Some(file_id)) => {
                Message::human(prompts::document_query(file_id, &state.user_query))
            }
            _ => Message::human(state.user_query.clone()),
        };
        let ctx = ToolContext {
            user_id: user_id.to_string(),
            file_id: state.file_id.clone(),
        };

        let run = self.agent.run(state, human, &bound, &ctx).await?;
        Ok(ChatTurn {
            conversation_id: run.state.conversation_id,
            answer: run.answer,
            tools_used: run.tools_used,
            selected_node: node,
            routing,
        })
    }
}
