use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::RwLock;
use tokio::sync::OnceCell;

use crate::models::{VectorMatch, VectorRecord};
use crate::storage::chroma_client::{ChromaClient, ChromaError};

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("Chroma error: {0}")]
    Chroma(#[from] ChromaError),
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
}

/// Conjunction of metadata equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, Value)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &serde_json::Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }

    /// Chroma `where` clause; a single condition cannot be wrapped in `$and`.
    pub fn to_chroma_where(&self) -> Option<Value> {
        let mut clauses: Vec<Value> = self
            .conditions
            .iter()
            .map(|(key, value)| json!({ key.as_str(): { "$eq": value } }))
            .collect();
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(json!({ "$and": clauses })),
        }
    }
}

// ============================================
// TRAIT DEFINITION - with Send + Sync bounds
// ============================================
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `embedding`, best first.
    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>, VectorStoreError>;

    /// Every record matching `filter`, in insertion order.
    async fn fetch(&self, filter: &MetadataFilter) -> Result<Vec<VectorMatch>, VectorStoreError>;

    async fn delete(&self, filter: &MetadataFilter) -> Result<(), VectorStoreError>;
}

// ============================================
// CHROMA IMPLEMENTATION
// ============================================
pub struct ChromaVectorStore {
    client: ChromaClient,
    collection: String,
    collection_id: OnceCell<String>,
}

impl ChromaVectorStore {
    pub fn new(client: ChromaClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
            collection_id: OnceCell::new(),
        }
    }

    /// Resolves the collection id on first use and caches it for the process lifetime.
    async fn collection_id(&self) -> Result<&str, VectorStoreError> {
        let id = self
            .collection_id
            .get_or_try_init(|| self.client.ensure_collection(&self.collection))
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        let id = self.collection_id().await?;
        self.client.upsert(id, &records).await?;
        Ok(())
    }

    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let id = self.collection_id().await?;
        let mut results = self
            .client
            .query(id, embedding, top_k, filter.to_chroma_where())
            .await?;
        sort_by_score(&mut results);
        Ok(results)
    }

    async fn fetch(&self, filter: &MetadataFilter) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let id = self.collection_id().await?;
        Ok(self.client.get(id, filter.to_chroma_where(), None).await?)
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<(), VectorStoreError> {
        let Some(where_clause) = filter.to_chroma_where() else {
            return Err(VectorStoreError::Unavailable(
                "refusing to delete without a filter".to_string(),
            ));
        };
        let id = self.collection_id().await?;
        self.client.delete(id, where_clause).await?;
        Ok(())
    }
}

// ============================================
// IN-MEMORY IMPLEMENTATION
// ============================================

/// Process-local store with brute-force cosine similarity. Used for local
/// development without Chroma and by the test suite.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> VectorStoreError {
        VectorStoreError::Unavailable("in-memory store lock poisoned".to_string())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn sort_by_score(results: &mut [VectorMatch]) {
    results.sort_by(|a, b| {
        b.score
            .unwrap_or(f32::MIN)
            .total_cmp(&a.score.unwrap_or(f32::MIN))
    });
}

fn to_match(record: &VectorRecord, score: Option<f32>) -> VectorMatch {
    VectorMatch {
        id: record.id.clone(),
        score,
        document: record.document.clone(),
        metadata: record.metadata.clone(),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        let mut stored = self.records.write().map_err(|_| Self::poisoned())?;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let stored = self.records.read().map_err(|_| Self::poisoned())?;
        let mut results: Vec<VectorMatch> = stored
            .iter()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| to_match(r, Some(cosine_similarity(&embedding, &r.embedding))))
            .collect();
        sort_by_score(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn fetch(&self, filter: &MetadataFilter) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let stored = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(stored
            .iter()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| to_match(r, None))
            .collect())
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<(), VectorStoreError> {
        if filter.is_empty() {
            return Err(VectorStoreError::Unavailable(
                "refusing to delete without a filter".to_string(),
            ));
        }
        let mut stored = self.records.write().map_err(|_| Self::poisoned())?;
        stored.retain(|r| !filter.matches(&r.metadata));
        Ok(())
    }
}
