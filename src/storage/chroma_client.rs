use crate::models::{VectorMatch, VectorRecord};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChromaError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Chroma API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Malformed Chroma response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct ChromaUpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    metadatas: Vec<&'a Map<String, Value>>,
    documents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChromaQueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_clause: Option<Value>,
    include: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ChromaGetRequest {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_clause: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    include: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChromaQueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Debug, Deserialize)]
struct ChromaGetResponse {
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
}

/// Rust-native ChromaDB client using HTTP API v2
pub struct ChromaClient {
    base_url: String,
    client: Client,
    tenant: String,
    database: String,
}

impl ChromaClient {
    pub fn new(base_url: String) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
        }
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn collection_operation_url(&self, collection_id: &str, operation: &str) -> String {
        format!("{}/{}/{}", self.collections_url(), collection_id, operation)
    }

    async fn api_error(response: reqwest::Response) -> ChromaError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        ChromaError::ApiError { status, message }
    }

    /// Get or create a cosine-space collection and return its id
    pub async fn ensure_collection(&self, name: &str) -> Result<String, ChromaError> {
        let body = json!({
            "name": name,
            "get_or_create": true,
            "metadata": { "hnsw:space": "cosine" }
        });

        let response = self
            .client
            .post(self.collections_url())
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let collection: Value = response.json().await?;
                let id = collection["id"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ChromaError::CollectionNotFound(name.to_string()))?;
                tracing::debug!(collection = name, id = %id, "Chroma collection ready");
                Ok(id)
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Store or update a batch of vectors with their documents and metadata
    pub async fn upsert(
        &self,
        collection_id: &str,
        records: &[VectorRecord],
    ) -> Result<(), ChromaError> {
        if records.is_empty() {
            return Ok(());
        }
        let url = self.collection_operation_url(collection_id, "upsert");

        let request = ChromaUpsertRequest {
            ids: records.iter().map(|r| r.id.as_str()).collect(),
            embeddings: records.iter().map(|r| r.embedding.as_slice()).collect(),
            metadatas: records.iter().map(|r| &r.metadata).collect(),
            documents: records.iter().map(|r| r.document.as_str()).collect(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                tracing::trace!("Upserted {} vectors", records.len());
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Query the `limit` nearest vectors, optionally restricted by a `where` clause
    pub async fn query(
        &self,
        collection_id: &str,
        embedding: Vec<f32>,
        limit: usize,
        where_clause: Option<Value>,
    ) -> Result<Vec<VectorMatch>, ChromaError> {
        let url = self.collection_operation_url(collection_id, "query");

        let request = ChromaQueryRequest {
            query_embeddings: vec![embedding],
            n_results: limit,
            where_clause,
            include: vec!["distances", "metadatas", "documents"],
        };

        let response = self.client.post(&url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK => {
                let query_response: ChromaQueryResponse = response.json().await?;
                Self::parse_query_results(query_response)
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Fetch stored vectors matching a `where` clause, without similarity ranking
    pub async fn get(
        &self,
        collection_id: &str,
        where_clause: Option<Value>,
        limit: Option<usize>,
    ) -> Result<Vec<VectorMatch>, ChromaError> {
        let url = self.collection_operation_url(collection_id, "get");

        let request = ChromaGetRequest {
            where_clause,
            limit,
            include: vec!["metadatas", "documents"],
        };

        let response = self.client.post(&url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK => {
                let get_response: ChromaGetResponse = response.json().await?;
                Ok(Self::parse_get_results(get_response))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Delete vectors matching a `where` clause
    pub async fn delete(&self, collection_id: &str, where_clause: Value) -> Result<(), ChromaError> {
        let url = self.collection_operation_url(collection_id, "delete");

        let body = json!({ "where": where_clause });

        let response = self.client.post(&url).json(&body).send().await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }

    fn parse_query_results(response: ChromaQueryResponse) -> Result<Vec<VectorMatch>, ChromaError> {
        let Some(ids) = response.ids.into_iter().next() else {
            return Ok(Vec::new());
        };

        let distances = response
            .distances
            .and_then(|d| d.into_iter().next())
            .ok_or_else(|| ChromaError::InvalidResponse("no distances returned".to_string()))?;
        let mut metadatas = response
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut documents = response
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        let results = ids
            .into_iter()
            .enumerate()
            .map(|(idx, id)| {
                // Cosine distance in [0, 2]; flip it so that higher means closer
                let score = distances.get(idx).copied().flatten().map(|d| 1.0 - d);
                VectorMatch {
                    id,
                    score,
                    document: documents.next().flatten().unwrap_or_default(),
                    metadata: metadatas.next().flatten().unwrap_or_default(),
                }
            })
            .collect();

        Ok(results)
    }

    fn parse_get_results(response: ChromaGetResponse) -> Vec<VectorMatch> {
        let mut metadatas = response.metadatas.unwrap_or_default().into_iter();
        let mut documents = response.documents.unwrap_or_default().into_iter();

        response
            .ids
            .into_iter()
            .map(|id| VectorMatch {
                id,
                score: None,
                document: documents.next().flatten().unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
            })
            .collect()
    }

    /// Health check method - uses v2 API
    pub async fn ping(&self) -> Result<(), ChromaError> {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        self.client.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
