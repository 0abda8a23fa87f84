use std::collections::HashMap;
use std::sync::Arc;

use crate::models::document::{
    FileDetails, FileSummary, META_CHUNK_INDEX, META_FILE_ID, META_FILE_NAME, META_PAGE_COUNT,
    META_START_OFFSET, META_UPLOADED_AT, META_USER_ID,
};
use crate::models::VectorMatch;
use crate::storage::vector_store::{MetadataFilter, VectorStore, VectorStoreError};

/// Document-level view over the chunk vectors of uploaded files. Every read
/// and delete is scoped by the same `{fileId, userId}` filter.
pub struct FileRepository {
    store: Arc<dyn VectorStore>,
}

impl FileRepository {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    fn file_filter(user_id: &str, file_id: &str) -> MetadataFilter {
        MetadataFilter::new()
            .eq(META_FILE_ID, file_id)
            .eq(META_USER_ID, user_id)
    }

    /// Uploaded files owned by `user_id`, newest first.
    pub async fn list_files(&self, user_id: &str) -> Result<Vec<FileSummary>, VectorStoreError> {
        let chunks = self
            .store
            .fetch(&MetadataFilter::new().eq(META_USER_ID, user_id))
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut files: HashMap<String, FileSummary> = HashMap::new();
        for chunk in &chunks {
            // Webhook knowledge shares the store but carries no fileId
            let Some(file_id) = chunk.meta_str(META_FILE_ID) else {
                continue;
            };
            let entry = files.entry(file_id.to_string()).or_insert_with(|| {
                order.push(file_id.to_string());
                summary_from(file_id, chunk)
            });
            entry.chunks += 1;
        }

        let mut listed: Vec<FileSummary> = order
            .into_iter()
            .filter_map(|id| files.remove(&id))
            .collect();
        listed.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        Ok(listed)
    }

    pub async fn get_file(
        &self,
        user_id: &str,
        file_id: &str,
    ) -> Result<Option<FileDetails>, VectorStoreError> {
        let mut chunks = self.store.fetch(&Self::file_filter(user_id, file_id)).await?;
        if chunks.is_empty() {
            return Ok(None);
        }

        chunks.sort_by_key(|c| c.meta_u64(META_CHUNK_INDEX).unwrap_or(u64::MAX));
        let summary = summary_from(file_id, &chunks[0]);

        Ok(Some(FileDetails {
            file_id: summary.file_id,
            file_name: summary.file_name,
            uploaded_at: summary.uploaded_at,
            chunks: chunks.len(),
            pages: summary.pages,
            content: reassemble(&chunks),
        }))
    }

    /// Removes every chunk of the file. Returns `false` when the user owns no
    /// such file.
    pub async fn delete_file(&self, user_id: &str, file_id: &str) -> Result<bool, VectorStoreError> {
        let filter = Self::file_filter(user_id, file_id);
        if self.store.fetch(&filter).await?.is_empty() {
            return Ok(false);
        }
        self.store.delete(&filter).await?;
        tracing::info!(file_id, user_id, "Deleted file chunks");
        Ok(true)
    }
}

fn summary_from(file_id: &str, chunk: &VectorMatch) -> FileSummary {
    FileSummary {
        file_id: file_id.to_string(),
        file_name: chunk.meta_str(META_FILE_NAME).unwrap_or_default().to_string(),
        uploaded_at: chunk.meta_str(META_UPLOADED_AT).unwrap_or_default().to_string(),
        chunks: 0,
        pages: chunk.meta_u64(META_PAGE_COUNT).unwrap_or(0) as usize,
    }
}

/// Joins chunks (already in index order) back into text. Chunks that record
/// their start offset have their overlap with the previous chunk removed;
/// otherwise chunks are joined with a newline.
pub fn reassemble(chunks: &[VectorMatch]) -> String {
    let mut out = String::new();
    // Offset (in the extracted text) up to which `out` is complete
    let mut covered: Option<usize> = None;

    for chunk in chunks {
        let text = chunk.document.as_str();
        let start = chunk.meta_u64(META_START_OFFSET).map(|s| s as usize);

        match (start, covered) {
            (Some(start), Some(end)) if start < end => {
                let skip = end - start;
                if skip < text.len() {
                    if let Some(rest) = text.get(skip..) {
                        out.push_str(rest);
                    } else {
                        out.push('\n');
                        out.push_str(text);
                    }
                }
            }
            _ => {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }

        covered = match (start, covered) {
            (Some(start), Some(end)) => Some(end.max(start + text.len())),
            (Some(start), None) => Some(start + text.len()),
            _ => None,
        };
    }

    out
}
