use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::{Tool, ToolContext, ToolError, ToolKind, ToolOutput};
use crate::services::search_client::{SearchClient, SearchDepth};

fn default_max_results() -> u8 {
    5
}

fn default_depth() -> SearchDepth {
    SearchDepth::Advanced
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchArgs {
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 10))]
    pub max_results: u8,
    #[serde(default = "default_depth")]
    pub search_depth: SearchDepth,
}

pub struct WebSearchTool {
    client: SearchClient,
}

impl WebSearchTool {
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    type Args = WebSearchArgs;
    const KIND: ToolKind = ToolKind::WebSearch;

    fn description(&self) -> &'static str {
        "Search the web for current information, news and facts not found in the \
         user's documents or team knowledge."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "maxResults": { "type": "integer", "minimum": 1, "maximum": 10, "default": 5 },
                "searchDepth": { "type": "string", "enum": ["basic", "advanced"], "default": "advanced" }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, args: WebSearchArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let found = self
            .client
            .search(&args.query, args.max_results, args.search_depth)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let count = found.results.len();
        let data = json!({
            "query": args.query,
            "answer": found.answer,
            "results": found.results,
        });
        Ok(ToolOutput::new(data)
            .with_meta("resultCount", count)
            .with_meta("searchDepth", json!(args.search_depth)))
    }
}
