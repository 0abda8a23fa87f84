//! Ingestion of external team knowledge (Slack messages, Jira issues, GitHub
//! commits) delivered through the webhook endpoint.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::chat::now_timestamp;
use crate::models::document::META_SOURCE;
use crate::models::VectorRecord;
use crate::services::embedding_service::{EmbeddingError, EmbeddingService};
use crate::storage::vector_store::{VectorStore, VectorStoreError};

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Data missing")]
    MissingData,
    #[error("Unknown webhook source")]
    UnknownSource(String),
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: KnowledgeSource, reason: String },
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Vector upsert failed: {0}")]
    Storage(#[from] VectorStoreError),
}

/// Origin of a knowledge item. Stored and searched under the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeSource {
    Slack,
    Jira,
    Github,
}

impl KnowledgeSource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slack" => Some(Self::Slack),
            "jira" => Some(Self::Jira),
            "github" => Some(Self::Github),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Jira => "jira",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item to embed and store.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeItem {
    pub source: KnowledgeSource,
    pub channel: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl KnowledgeItem {
    /// Content-addressed id so that redelivered webhooks overwrite instead of duplicating.
    pub fn vector_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        if let Some(ts) = self.metadata.get("timestamp") {
            hasher.update(ts.to_string().as_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        format!("{}-{}-{}", self.source, slug(&self.channel), &digest[..16])
    }
}

fn slug(raw: &str) -> String {
    let slug: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    if slug.is_empty() {
        "general".to_string()
    } else {
        slug
    }
}

/// Chroma only accepts flat metadata with scalar values
fn flatten_metadata(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let flat = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => value.clone(),
                other => Value::String(other.to_string()),
            };
            (key.clone(), flat)
        })
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Turns a webhook `{Source, Data}` pair into storable items.
pub fn parse_webhook(source: &str, data: Option<&Value>) -> Result<Vec<KnowledgeItem>, KnowledgeError> {
    let data = data.filter(|d| !d.is_null()).ok_or(KnowledgeError::MissingData)?;
    let source_kind =
        KnowledgeSource::parse(source).ok_or_else(|| KnowledgeError::UnknownSource(source.to_string()))?;
    let invalid = |reason: &str| KnowledgeError::InvalidPayload {
        kind: source_kind,
        reason: reason.to_string(),
    };

    match source_kind {
        KnowledgeSource::Slack => {
            let text = data
                .get("text")
                .and_then(value_text)
                .ok_or_else(|| invalid("missing text"))?;
            let user = data.get("user").and_then(value_text).unwrap_or_else(|| "unknown".into());
            let channel = data
                .get("channel")
                .and_then(value_text)
                .unwrap_or_else(|| "knowledge-chatbot".into());
            let timestamp = data
                .get("ts")
                .or_else(|| data.get("timestamp"))
                .and_then(value_text)
                .unwrap_or_else(now_timestamp);

            let mut metadata = Map::new();
            metadata.insert("user".into(), json!(user));
            metadata.insert("channel".into(), json!(channel));
            metadata.insert("timestamp".into(), json!(timestamp));
            metadata.insert("text".into(), json!(text));

            Ok(vec![KnowledgeItem {
                source: source_kind,
                channel,
                text,
                metadata,
            }])
        }
        KnowledgeSource::Jira => {
            let fields = data.as_object().ok_or_else(|| invalid("expected an object"))?;
            let text = fields
                .values()
                .filter_map(value_text)
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                return Err(invalid("no field values"));
            }
            let channel = fields
                .get("Project Name")
                .and_then(value_text)
                .unwrap_or_else(|| "jira".into());

            let mut metadata = flatten_metadata(fields);
            if let Some(creator) = fields.get("Creator").and_then(value_text) {
                metadata.insert("user".into(), json!(creator));
            }
            if let Some(created) = fields.get("Created At").and_then(value_text) {
                metadata.insert("timestamp".into(), json!(created));
            }

            Ok(vec![KnowledgeItem {
                source: source_kind,
                channel,
                text,
                metadata,
            }])
        }
        KnowledgeSource::Github => {
            let pushes = data
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("expected data array"))?;

            let mut items = Vec::new();
            for push in pushes {
                let author = push.get("user").and_then(value_text).unwrap_or_else(|| "unknown".into());
                let commits = push.get("commits").and_then(Value::as_array);
                for commit in commits.into_iter().flatten() {
                    let Some(message) = commit.get("message").and_then(value_text) else {
                        warn!(author = %author, "Skipping GitHub commit without message");
                        continue;
                    };
                    let repo = commit.get("repo").and_then(value_text).unwrap_or_else(|| "unknown".into());
                    let timestamp = commit.get("date").and_then(value_text).unwrap_or_else(now_timestamp);

                    let mut metadata = Map::new();
                    metadata.insert("author".into(), json!(author));
                    metadata.insert("repo".into(), json!(repo));
                    metadata.insert("message".into(), json!(message));
                    metadata.insert("timestamp".into(), json!(timestamp));
                    if let Some(id) = commit.get("id").and_then(value_text) {
                        metadata.insert("id".into(), json!(id));
                    }

                    items.push(KnowledgeItem {
                        source: source_kind,
                        channel: repo,
                        text: message,
                        metadata,
                    });
                }
            }
            Ok(items)
        }
    }
}

/// Result of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReport {
    pub stored: Vec<String>,
    pub failed: usize,
}

pub struct KnowledgeIngestor {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl KnowledgeIngestor {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    /// Embeds and upserts one item, returning its vector id.
    pub async fn store_item(&self, item: KnowledgeItem) -> Result<String, KnowledgeError> {
        let embedding = self.embeddings.generate_embedding(&item.text).await?;
        let id = item.vector_id();

        let mut metadata = flatten_metadata(&item.metadata);
        metadata.insert(META_SOURCE.into(), json!(item.source.as_str()));
        metadata.insert("channel".into(), json!(item.channel));

        self.store
            .upsert(vec![VectorRecord {
                id: id.clone(),
                embedding,
                document: item.text,
                metadata,
            }])
            .await?;
        Ok(id)
    }

    /// Stores every item of a delivery. A single-item delivery fails as a
    /// whole; for multi-item deliveries (GitHub pushes) failed items are
    /// logged and counted.
    pub async fn ingest(&self, items: Vec<KnowledgeItem>) -> Result<WebhookReport, KnowledgeError> {
        let single = items.len() == 1;
        let mut report = WebhookReport {
            stored: Vec::with_capacity(items.len()),
            failed: 0,
        };

        for item in items {
            let source = item.source;
            match self.store_item(item).await {
                Ok(id) => report.stored.push(id),
                Err(e) if single => return Err(e),
                Err(e) => {
                    warn!(source = %source, error = %e, "Failed to store knowledge item");
                    report.failed += 1;
                }
            }
        }

        info!(stored = report.stored.len(), failed = report.failed, "Webhook ingested");
        Ok(report)
    }
}
