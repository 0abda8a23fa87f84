use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use super::{Tool, ToolContext, ToolError, ToolKind, ToolOutput};
use crate::models::document::{
    META_CHUNK_INDEX, META_FILE_ID, META_FILE_NAME, META_PAGE_NUMBER, META_USER_ID,
};
use crate::services::embedding_service::EmbeddingService;
use crate::storage::vector_store::{MetadataFilter, VectorStore};

fn default_max_results() -> usize {
    3
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQaArgs {
    #[validate(length(min = 1))]
    pub query: String,
    #[validate(length(min = 1))]
    pub file_id: String,
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 5))]
    pub max_results: usize,
}

/// Similarity search over the chunks of one uploaded document, restricted to
/// documents owned by the requesting user.
pub struct DocumentQaTool {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl DocumentQaTool {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }
}

#[async_trait]
impl Tool for DocumentQaTool {
    type Args = DocumentQaArgs;
    const KIND: ToolKind = ToolKind::DocumentQa;

    fn description(&self) -> &'static str {
        "Search the content of an uploaded document. Use this for any question about \
         the document the user attached; pass the document's fileId."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for in the document" },
                "fileId": { "type": "string", "description": "Id of the uploaded document" },
                "maxResults": { "type": "integer", "minimum": 1, "maximum": 5, "default": 3 }
            },
            "required": ["query", "fileId"]
        })
    }

    async fn run(&self, args: DocumentQaArgs, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let embedding = self
            .embeddings
            .generate_embedding(&args.query)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let filter = MetadataFilter::new()
            .eq(META_FILE_ID, args.file_id.as_str())
            .eq(META_USER_ID, ctx.user_id.as_str());
        let matches = self
            .store
            .query(embedding, args.max_results, &filter)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let results: Vec<Value> = matches
            .iter()
            .map(|m| {
                json!({
                    "content": m.document,
                    "metadata": {
                        "fileName": m.meta_str(META_FILE_NAME),
                        "chunkIndex": m.meta_u64(META_CHUNK_INDEX),
                        "pageNumber": m.meta_u64(META_PAGE_NUMBER),
                        "score": m.score,
                    }
                })
            })
            .collect();

        let count = results.len();
        let mut data = json!({ "query": args.query, "results": results });
        if count == 0 {
            data["message"] = json!("No relevant content found in this document.");
        }

        Ok(ToolOutput::new(data)
            .with_meta("fileId", args.file_id)
            .with_meta("resultCount", count))
    }
}
