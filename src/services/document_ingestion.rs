//! Upload pipeline: extract text, split into overlapping chunks, embed each
//! chunk, upsert the vectors in fixed-size batches.
//!
//! Stages run strictly in order and the first failure aborts the run.
//! Batches already upserted when a later batch fails are left in place.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::document::{
    META_CHUNK_INDEX, META_FILE_ID, META_FILE_NAME, META_MIME_TYPE, META_PAGE_COUNT,
    META_PAGE_NUMBER, META_SOURCE, META_START_OFFSET, META_UPLOADED_AT, META_USER_ID,
};
use crate::models::{DocumentMetadata, IngestionReport, VectorRecord};
use crate::services::embedding_service::{EmbeddingError, EmbeddingService};
use crate::services::text_extraction::{self, page_for_offset, ExtractionError};
use crate::services::text_splitter::TextSplitter;
use crate::storage::vector_store::{VectorStore, VectorStoreError};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Document contains no extractable text")]
    EmptyDocument,
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Vector upsert failed: {0}")]
    Storage(#[from] VectorStoreError),
    #[error("Extraction task failed: {0}")]
    Task(String),
}

pub struct DocumentIngestor {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    batch_size: usize,
}

impl DocumentIngestor {
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        store: Arc<dyn VectorStore>,
        splitter: TextSplitter,
        batch_size: usize,
    ) -> Self {
        Self {
            embeddings,
            store,
            splitter,
            batch_size: batch_size.max(1),
        }
    }

    /// Vector id of chunk `index` of `file_id`.
    pub fn chunk_id(file_id: &str, index: usize) -> String {
        format!("{}-chunk-{}", file_id, index)
    }

    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        meta: &DocumentMetadata,
    ) -> Result<IngestionReport, IngestionError> {
        let mime_type = meta.mime_type.clone();
        let extracted =
            tokio::task::spawn_blocking(move || text_extraction::extract_text(&bytes, &mime_type))
                .await
                .map_err(|e| IngestionError::Task(e.to_string()))??;

        if !extracted.has_text() {
            return Err(IngestionError::EmptyDocument);
        }
        let page_count = extracted.page_count();
        let (text, page_starts) = extracted.joined();
        debug!(file_id = %meta.file_id, pages = page_count, chars = text.len(), "Extracted text");

        let chunks = self.splitter.split(&text);
        if chunks.is_empty() {
            return Err(IngestionError::EmptyDocument);
        }
        debug!(file_id = %meta.file_id, chunks = chunks.len(), "Split document");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embeddings
            .generate_embeddings_batch(&texts, self.batch_size)
            .await?;

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, embedding))| VectorRecord {
                id: Self::chunk_id(&meta.file_id, index),
                embedding,
                metadata: chunk_metadata(
                    meta,
                    index,
                    page_for_offset(&page_starts, chunk.start),
                    page_count,
                    chunk.start,
                ),
                document: chunk.text,
            })
            .collect();
        let chunk_count = records.len();

        let mut pending = records.into_iter().peekable();
        let mut batch_no = 0;
        while pending.peek().is_some() {
            let batch: Vec<VectorRecord> = pending.by_ref().take(self.batch_size).collect();
            debug!(file_id = %meta.file_id, batch = batch_no, size = batch.len(), "Upserting batch");
            self.store.upsert(batch).await?;
            batch_no += 1;
        }

        info!(
            file_id = %meta.file_id,
            file_name = %meta.file_name,
            pages = page_count,
            chunks = chunk_count,
            "Document ingested"
        );

        Ok(IngestionReport {
            file_id: meta.file_id.clone(),
            page_count,
            chunk_count,
        })
    }
}

fn chunk_metadata(
    meta: &DocumentMetadata,
    index: usize,
    page_number: usize,
    page_count: usize,
    start: usize,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(META_FILE_ID.into(), json!(meta.file_id));
    map.insert(META_FILE_NAME.into(), json!(meta.file_name));
    map.insert(META_USER_ID.into(), json!(meta.user_id));
    map.insert(META_UPLOADED_AT.into(), json!(meta.uploaded_at));
    map.insert(META_MIME_TYPE.into(), json!(meta.mime_type));
    map.insert(META_CHUNK_INDEX.into(), json!(index));
    map.insert(META_PAGE_NUMBER.into(), json!(page_number));
    map.insert(META_PAGE_COUNT.into(), json!(page_count));
    map.insert(META_START_OFFSET.into(), json!(start));
    map.insert(META_SOURCE.into(), json!("upload"));
    map
}
