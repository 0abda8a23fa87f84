//! Callable tools offered to the chat model.
//!
//! Each tool declares a typed, validated argument struct. The model's raw
//! JSON arguments are deserialized and validated before the tool runs, and
//! every outcome (bad arguments, upstream failure, even a panic) comes back
//! as a [`ToolResult`] rather than an error.

pub mod document_qa;
pub mod knowledge_search;
pub mod registry;
pub mod weather;
pub mod web_search;

use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::panic::AssertUnwindSafe;
use validator::Validate;

use crate::models::chat::now_timestamp;
use crate::models::ToolSchema;

pub use registry::{RegistryError, ToolRegistry};

/// The closed set of tools this service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    DocumentQa,
    WeatherLookup,
    WebSearch,
    SlackSearch,
    JiraSearch,
    GithubSearch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::DocumentQa,
        ToolKind::WeatherLookup,
        ToolKind::WebSearch,
        ToolKind::SlackSearch,
        ToolKind::JiraSearch,
        ToolKind::GithubSearch,
    ];

    /// Function name advertised to the model
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::DocumentQa => "documentQA",
            ToolKind::WeatherLookup => "weatherLookup",
            ToolKind::WebSearch => "webSearch",
            ToolKind::SlackSearch => "slack_search",
            ToolKind::JiraSearch => "jira_search",
            ToolKind::GithubSearch => "github_search",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-request facts a tool may rely on but the model does not control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub user_id: String,
    pub file_id: Option<String>,
}

/// Successful tool payload.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub data: Value,
    pub metadata: Map<String, Value>,
}

impl ToolOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            metadata: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Upstream(String),
    #[error("Tool '{0}' is not available")]
    NotFound(String),
    #[error("Tool '{0}' failed unexpectedly")]
    Panicked(String),
}

/// In-band result of a tool invocation, serialized as the tool message
/// content sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    pub fn success(output: ToolOutput) -> Self {
        let mut metadata = output.metadata;
        metadata.insert("timestamp".into(), Value::String(now_timestamp()));
        Self {
            success: true,
            data: Some(output.data),
            error: None,
            metadata,
        }
    }

    pub fn failure(error: &ToolError) -> Self {
        let mut metadata = Map::new();
        metadata.insert("timestamp".into(), Value::String(now_timestamp()));
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            metadata,
        }
    }

    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":"unserializable tool result"}"#.to_string()
        })
    }
}

/// A tool with a statically typed argument struct.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Args: DeserializeOwned + Validate + Send + 'static;

    const KIND: ToolKind;

    fn description(&self) -> &'static str;

    /// JSON schema of `Args`, advertised to the model
    fn parameters(&self) -> Value;

    async fn run(&self, args: Self::Args, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;
}

/// Object-safe view of a [`Tool`], as stored in the registry.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn schema(&self) -> ToolSchema;

    /// Parse, validate and run. Never fails.
    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> ToolResult;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn kind(&self) -> ToolKind {
        T::KIND
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: T::KIND.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> ToolResult {
        let args: T::Args = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolResult::failure(&ToolError::InvalidArguments(e.to_string())),
        };
        if let Err(e) = args.validate() {
            return ToolResult::failure(&ToolError::InvalidArguments(e.to_string()));
        }

        match AssertUnwindSafe(self.run(args, ctx)).catch_unwind().await {
            Ok(Ok(output)) => ToolResult::success(output),
            Ok(Err(e)) => {
                tracing::warn!(tool = %T::KIND, error = %e, "Tool returned an error");
                ToolResult::failure(&e)
            }
            Err(_) => {
                tracing::error!(tool = %T::KIND, "Tool panicked");
                ToolResult::failure(&ToolError::Panicked(T::KIND.name().to_string()))
            }
        }
    }
}
