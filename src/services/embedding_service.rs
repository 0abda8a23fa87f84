// src/services/embedding_service.rs
//! Embedding service with provider abstraction

use crate::services::embedding_provider::{EmbeddingProvider, ProviderError};
use std::sync::Arc;
use tokio::sync::AcquireError;
use tokio::sync::Semaphore;
use tracing::debug;

/// Upper bound on embedding requests in flight at once
const MAX_CONCURRENT_EMBEDDINGS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("No embeddings returned")]
    NoEmbeddings,
    #[error("Semaphore error: {0}")]
    SemaphoreError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<AcquireError> for EmbeddingError {
    fn from(err: AcquireError) -> Self {
        EmbeddingError::SemaphoreError(err.to_string())
    }
}

impl From<ProviderError> for EmbeddingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NoEmbeddings => EmbeddingError::NoEmbeddings,
            other => EmbeddingError::ProviderError(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    semaphore: Arc<Semaphore>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_EMBEDDINGS)),
        }
    }

    /// Generate embedding using configured provider
    pub async fn generate_embedding(&self, content: &str) -> Result<Vec<f32>, EmbeddingError> {
        let _permit = self.semaphore.acquire().await?;
        let embedding = self.provider.generate_embedding(content).await?;
        if embedding.is_empty() {
            return Err(EmbeddingError::NoEmbeddings);
        }
        Ok(embedding)
    }

    /// Generate embeddings for multiple texts in batches, preserving input order
    pub async fn generate_embeddings_batch(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (batch_no, chunk) in texts.chunks(batch_size.max(1)).enumerate() {
            debug!(batch = batch_no, size = chunk.len(), "Embedding batch");

            // Process batch concurrently
            let batch_futures = chunk.iter().map(|text| self.generate_embedding(text));
            let batch_results = futures::future::join_all(batch_futures).await;

            // Collect results, failing if any individual embedding fails
            for result in batch_results {
                all_embeddings.push(result?);
            }
        }

        Ok(all_embeddings)
    }
}
