use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{Message, Role, ToolCall, ToolSchema};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A chat-completion model that can be offered tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the next AI message: either a final answer (no tool calls) or
    /// a request to invoke one or more of `tools`.
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, LlmError>;
}

/// Sampling parameters applied to every request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// OpenAI-compatible `/chat/completions` client with function calling
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: Option<String>,
    settings: GenerationSettings,
}

impl OpenAiChatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        project_id: Option<String>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            settings,
        }
    }

    fn format_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::Human => "user",
                    Role::Ai => "assistant",
                    Role::Tool => "tool",
                };
                let mut msg = json!({ "role": role, "content": m.content });
                if !m.tool_calls.is_empty() {
                    msg["tool_calls"] = json!(m
                        .tool_calls
                        .iter()
                        .map(|tc| json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        }))
                        .collect::<Vec<_>>());
                }
                if let Some(ref id) = m.tool_call_id {
                    msg["tool_call_id"] = json!(id);
                }
                msg
            })
            .collect()
    }

    fn format_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn parse_reply(body: &Value) -> Result<Message, LlmError> {
        let choice = body["choices"]
            .get(0)
            .map(|c| &c["message"])
            .ok_or_else(|| LlmError::InvalidResponse("no choices in completion".to_string()))?;

        let content = choice["content"].as_str().unwrap_or_default().to_string();

        let calls = match choice["tool_calls"].as_array() {
            Some(calls) => calls
                .iter()
                .map(Self::parse_tool_call)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Message::ai_with_tool_calls(content, calls))
    }

    fn parse_tool_call(tc: &Value) -> Result<ToolCall, LlmError> {
        let missing = |field: &str| LlmError::InvalidResponse(format!("tool call without {}", field));
        let id = tc["id"].as_str().ok_or_else(|| missing("id"))?;
        let name = tc["function"]["name"]
            .as_str()
            .ok_or_else(|| missing("function name"))?;
        let raw = tc["function"]["arguments"].as_str().unwrap_or("{}");

        Ok(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            // Unparseable arguments are kept verbatim and rejected by the tool
            arguments: serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, LlmError> {
        let mut request = json!({
            "model": self.settings.model,
            "messages": Self::format_messages(messages),
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        if !tools.is_empty() {
            request["tools"] = json!(Self::format_tools(tools));
            request["tool_choice"] = json!("auto");
        }

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(ref project) = self.project_id {
            builder = builder.header("OpenAI-Project", project);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(LlmError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        Self::parse_reply(&body)
    }
}
