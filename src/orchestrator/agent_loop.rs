//! Model/tool round trips for one chat turn.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! AwaitingModel --(reply has no tool calls)--> Done
//! AwaitingModel --(reply requests tools)-----> ExecutingTool
//! ExecutingTool --(every call has a result)--> AwaitingModel
//! ```
//!
//! A model that still asks for tools after `recursion_limit` tool rounds
//! fails the turn with [`AgentError::RecursionLimitExceeded`].

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompts::SYSTEM_PROMPT;
use super::state::ConversationState;
use crate::models::{Message, ToolCall};
use crate::services::llm_client::{ChatModel, LlmError};
use crate::tools::{ToolContext, ToolError, ToolKind, ToolRegistry, ToolResult};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    Model(#[from] LlmError),
    #[error("Agent exceeded the recursion limit of {limit} tool round trips")]
    RecursionLimitExceeded { limit: usize },
}

/// Outcome of a completed turn.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Input state with the full turn history appended
    pub state: ConversationState,
    pub answer: String,
    /// Tools that actually ran, first-seen order, no repeats
    pub tools_used: Vec<String>,
    pub round_trips: usize,
}

enum Phase {
    AwaitingModel,
    ExecutingTool(Vec<ToolCall>),
    Done(String),
}

pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    recursion_limit: usize,
}

impl AgentLoop {
    pub fn new(model: Arc<dyn ChatModel>, registry: ToolRegistry, recursion_limit: usize) -> Self {
        Self {
            model,
            registry,
            recursion_limit,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Run the turn with `bound` as the only tools the model may use.
    pub async fn run(
        &self,
        mut state: ConversationState,
        human: Message,
        bound: &[ToolKind],
        ctx: &ToolContext,
    ) -> Result<AgentRun, AgentError> {
        let schemas = self.registry.schemas(bound);

        let mut history = Vec::with_capacity(state.messages.len() + 2);
        history.push(Message::system(SYSTEM_PROMPT));
        history.append(&mut state.messages);
        history.push(human);

        let mut round_trips = 0;
        let mut tools_used: Vec<String> = Vec::new();
        let mut phase = Phase::AwaitingModel;

        loop {
            phase = match phase {
                Phase::AwaitingModel => {
                    let reply = self.model.complete(&history, &schemas).await?;
                    if reply.requests_tools() {
                        if round_trips >= self.recursion_limit {
                            warn!(
                                conversation_id = %state.conversation_id,
                                limit = self.recursion_limit,
                                "Model still requesting tools at recursion limit"
                            );
                            return Err(AgentError::RecursionLimitExceeded {
                                limit: self.recursion_limit,
                            });
                        }
                        let calls = reply.tool_calls.clone();
                        history.push(reply);
                        Phase::ExecutingTool(calls)
                    } else {
                        let answer = reply.content.clone();
                        history.push(reply);
                        Phase::Done(answer)
                    }
                }
                Phase::ExecutingTool(calls) => {
                    round_trips += 1;
                    debug!(
                        conversation_id = %state.conversation_id,
                        round_trip = round_trips,
                        calls = calls.len(),
                        "Executing tool calls"
                    );

                    let results =
                        join_all(calls.iter().map(|call| self.execute(call, bound, ctx))).await;

                    for (call, (ran, result)) in calls.iter().zip(results) {
                        if ran && !tools_used.contains(&call.name) {
                            tools_used.push(call.name.clone());
                        }
                        history.push(Message::tool_result(call, result.to_content()));
                    }
                    Phase::AwaitingModel
                }
                Phase::Done(answer) => {
                    info!(
                        conversation_id = %state.conversation_id,
                        round_trips,
                        tools = ?tools_used,
                        "Agent finished"
                    );
                    state.messages = history;
                    return Ok(AgentRun {
                        state,
                        answer,
                        tools_used,
                        round_trips,
                    });
                }
            };
        }
    }

    /// Returns whether a tool actually ran, plus its result.
    async fn execute(&self, call: &ToolCall, bound: &[ToolKind], ctx: &ToolContext) -> (bool, ToolResult) {
        let tool = ToolKind::from_name(&call.name)
            .filter(|kind| bound.contains(kind))
            .and_then(|kind| self.registry.get(kind));

        match tool {
            Some(tool) => {
                info!(tool = %call.name, call_id = %call.id, "Invoking tool");
                (true, tool.invoke(call.arguments.clone(), ctx).await)
            }
            None => {
                warn!(tool = %call.name, "Model requested a tool that is not bound");
                (false, ToolResult::failure(&ToolError::NotFound(call.name.clone())))
            }
        }
    }
}
