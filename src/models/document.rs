use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

// Metadata keys written alongside every document chunk.
pub const META_FILE_ID: &str = "fileId";
pub const META_FILE_NAME: &str = "fileName";
pub const META_USER_ID: &str = "userId";
pub const META_UPLOADED_AT: &str = "uploadedAt";
pub const META_CHUNK_INDEX: &str = "chunkIndex";
pub const META_PAGE_NUMBER: &str = "pageNumber";
pub const META_PAGE_COUNT: &str = "pageCount";
pub const META_START_OFFSET: &str = "startOffset";
pub const META_MIME_TYPE: &str = "mimeType";
pub const META_SOURCE: &str = "source";

/// Identity and ownership of an uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub file_id: String,
    pub file_name: String,
    pub user_id: String,
    pub uploaded_at: String,
    pub mime_type: String,
}

/// One vector to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Map<String, Value>,
}

/// A stored vector read back from the store; `score` is set for similarity
/// queries only (higher is closer).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: Option<f32>,
    pub document: String,
    pub metadata: Map<String, Value>,
}

impl VectorMatch {
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub file_id: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_id: String,
    pub file_name: String,
    pub uploaded_at: String,
    pub chunks: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub file_id: String,
    pub file_name: String,
    pub uploaded_at: String,
    pub chunks: usize,
    pub pages: usize,
    /// Chunk texts reassembled in index order
    pub content: String,
}
