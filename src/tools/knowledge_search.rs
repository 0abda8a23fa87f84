//! Search over team knowledge ingested through the webhook: Slack
//! discussions, Jira issues and GitHub commits.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use super::{Tool, ToolContext, ToolError, ToolKind, ToolOutput};
use crate::models::document::META_SOURCE;
use crate::models::VectorMatch;
use crate::services::embedding_service::EmbeddingService;
use crate::services::knowledge_ingestion::KnowledgeSource;
use crate::storage::vector_store::{MetadataFilter, VectorStore};

const SLACK_TOP_K: usize = 15;
const JIRA_TOP_K: usize = 5;
const GITHUB_TOP_K: usize = 5;

/// Shared embed-then-query step, scoped to one knowledge source.
#[derive(Clone)]
pub struct KnowledgeSearcher {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl KnowledgeSearcher {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    async fn search(
        &self,
        source: KnowledgeSource,
        query: &str,
        top_k: usize,
        filters: &[(&str, &Option<String>)],
    ) -> Result<Vec<VectorMatch>, ToolError> {
        let embedding = self
            .embeddings
            .generate_embedding(query)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let mut filter = MetadataFilter::new().eq(META_SOURCE, source.as_str());
        for (key, value) in filters {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                filter = filter.eq(*key, value);
            }
        }

        // Stores return best-first already
        self.store
            .query(embedding, top_k, &filter)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))
    }
}

fn field<'a>(m: &'a VectorMatch, key: &str) -> &'a str {
    m.meta_str(key).unwrap_or("N/A")
}

fn output(query: &str, matches: &[VectorMatch], summary: String) -> ToolOutput {
    ToolOutput::new(json!({ "query": query, "summary": summary }))
        .with_meta("resultCount", matches.len())
}

// ==================== SLACK ====================

#[derive(Debug, Deserialize, Validate)]
pub struct SlackSearchArgs {
    #[validate(length(min = 1))]
    pub query: String,
}

pub struct SlackSearchTool {
    searcher: KnowledgeSearcher,
}

impl SlackSearchTool {
    pub fn new(searcher: KnowledgeSearcher) -> Self {
        Self { searcher }
    }
}

pub fn format_slack(matches: &[VectorMatch]) -> String {
    if matches.is_empty() {
        return "No relevant discussions found in the knowledge-chatbot channel.".to_string();
    }
    let lines: Vec<String> = matches
        .iter()
        .map(|m| {
            let user = m.meta_str("user").unwrap_or("unknown");
            let text = m.meta_str("text").unwrap_or(m.document.as_str());
            format!("{}: {}", user, text)
        })
        .collect();
    format!(
        "Based on discussions in the knowledge-chatbot channel:\n\n{}",
        lines.join("\n")
    )
}

#[async_trait]
impl Tool for SlackSearchTool {
    type Args = SlackSearchArgs;
    const KIND: ToolKind = ToolKind::SlackSearch;

    fn description(&self) -> &'static str {
        "Search team discussions from Slack. Use for questions about what the team \
         said, decided or discussed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn run(&self, args: SlackSearchArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let matches = self
            .searcher
            .search(KnowledgeSource::Slack, &args.query, SLACK_TOP_K, &[])
            .await?;
        Ok(output(&args.query, &matches, format_slack(&matches)))
    }
}

// ==================== JIRA ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JiraSearchArgs {
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

pub struct JiraSearchTool {
    searcher: KnowledgeSearcher,
}

impl JiraSearchTool {
    pub fn new(searcher: KnowledgeSearcher) -> Self {
        Self { searcher }
    }
}

pub fn format_jira(matches: &[VectorMatch]) -> String {
    if matches.is_empty() {
        return "No matching Jira issues found.".to_string();
    }
    let issues: Vec<String> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "Issue {}: {}\nEpic: {}\nType: {}\nStatus: {}\nAssignee: {}\nPriority: {}\n\
                 Project: {}\nCreated: {} by {}\nDescription: {}",
                i + 1,
                field(m, "Ticket Title"),
                field(m, "Epic"),
                field(m, "Ticket Type"),
                field(m, "Status"),
                field(m, "Assignee"),
                field(m, "Priority"),
                field(m, "Project Name"),
                field(m, "Created At"),
                field(m, "Creator"),
                field(m, "Ticket Description"),
            )
        })
        .collect();
    format!("Jira Search Results:\n\n{}", issues.join("\n\n"))
}

#[async_trait]
impl Tool for JiraSearchTool {
    type Args = JiraSearchArgs;
    const KIND: ToolKind = ToolKind::JiraSearch;

    fn description(&self) -> &'static str {
        "Search Jira issues by topic, optionally narrowed by issue type, status or assignee."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "issueType": { "type": "string", "description": "e.g. Bug, Story, Task" },
                "status": { "type": "string", "description": "e.g. Open, In Progress, Done" },
                "assignee": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, args: JiraSearchArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let matches = self
            .searcher
            .search(
                KnowledgeSource::Jira,
                &args.query,
                JIRA_TOP_K,
                &[
                    ("Ticket Type", &args.issue_type),
                    ("Status", &args.status),
                    ("Assignee", &args.assignee),
                ],
            )
            .await?;
        Ok(output(&args.query, &matches, format_jira(&matches)))
    }
}

// ==================== GITHUB ====================

#[derive(Debug, Deserialize, Validate)]
pub struct GithubSearchArgs {
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

pub struct GithubSearchTool {
    searcher: KnowledgeSearcher,
}

impl GithubSearchTool {
    pub fn new(searcher: KnowledgeSearcher) -> Self {
        Self { searcher }
    }
}

pub fn format_github(matches: &[VectorMatch]) -> String {
    if matches.is_empty() {
        return "No matching GitHub commits found.".to_string();
    }
    let commits: Vec<String> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "Commit {}: {}\nRepository: {}\nAuthor: {}\nDate: {}",
                i + 1,
                m.meta_str("message").unwrap_or(m.document.as_str()),
                field(m, "repo"),
                field(m, "author"),
                field(m, "timestamp"),
            )
        })
        .collect();
    format!("GitHub Search Results:\n\n{}", commits.join("\n\n"))
}

#[async_trait]
impl Tool for GithubSearchTool {
    type Args = GithubSearchArgs;
    const KIND: ToolKind = ToolKind::GithubSearch;

    fn description(&self) -> &'static str {
        "Search GitHub commit history, optionally narrowed by repository or author."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "repo": { "type": "string" },
                "user": { "type": "string", "description": "Commit author" }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, args: GithubSearchArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let matches = self
            .searcher
            .search(
                KnowledgeSource::Github,
                &args.query,
                GITHUB_TOP_K,
                &[("repo", &args.repo), ("author", &args.user)],
            )
            .await?;
        Ok(output(&args.query, &matches, format_github(&matches)))
    }
}
