use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use super::dto::{UploadData, UploadResponse};
use super::error::ApiError;
use super::routes::AppState;
use crate::auth::RequestUser;
use crate::models::chat::now_timestamp;
use crate::models::DocumentMetadata;
use crate::services::document_ingestion::IngestionError;
use crate::services::text_extraction::PDF_MIME;

const FILE_FIELD: &str = "file";

fn size_message(max_bytes: usize) -> String {
    let mb = max_bytes as f64 / (1024.0 * 1024.0);
    if mb.fract() == 0.0 {
        format!("File size cannot exceed {}MB", mb as u64)
    } else {
        format!("File size cannot exceed {:.1}MB", mb)
    }
}

fn type_message(allowed: &[String]) -> String {
    if allowed.len() == 1 && allowed[0] == PDF_MIME {
        "Only PDF files are allowed".to_string()
    } else {
        format!("Unsupported file type. Allowed types: {}", allowed.join(", "))
    }
}

fn field_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Validation(size_message(max_bytes))
    } else {
        ApiError::Validation(format!("File upload error: {}", err.body_text()))
    }
}

struct UploadedFile {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

async fn read_file_field(
    multipart: &mut Multipart,
    allowed_types: &[String],
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| field_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("document").to_string();
        let mime_type = field
            .content_type()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&mime_type)) {
            return Err(ApiError::Validation(type_message(allowed_types)));
        }

        let bytes = field.bytes().await.map_err(|e| field_error(e, max_bytes))?;
        if bytes.len() > max_bytes {
            return Err(ApiError::Validation(size_message(max_bytes)));
        }
        if bytes.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".to_string()));
        }

        return Ok(UploadedFile {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::Validation("No file uploaded".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = super::dto::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document ingested", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type or too large", body = super::dto::ErrorResponse),
        (status = 500, description = "Processing failed", body = super::dto::ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    user: RequestUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let config = &state.config;
    let file = read_file_field(&mut multipart, &config.allowed_upload_types, config.max_upload_bytes).await?;

    let meta = DocumentMetadata {
        file_id: Uuid::new_v4().to_string(),
        file_name: file.file_name,
        user_id: user.id().to_string(),
        uploaded_at: now_timestamp(),
        mime_type: file.mime_type,
    };
    info!(
        file_id = %meta.file_id,
        file_name = %meta.file_name,
        size = file.bytes.len(),
        "File received"
    );

    let report = state.ingestor.ingest(file.bytes, &meta).await.map_err(|e| {
        error!(file_id = %meta.file_id, error = %e, "Ingestion failed");
        match e {
            IngestionError::Extraction(_) | IngestionError::EmptyDocument => {
                ApiError::Validation(e.to_string())
            }
            other => ApiError::upstream("Failed to process PDF", other, state.development()),
        }
    })?;

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded and processed successfully".to_string(),
        data: UploadData {
            file_id: report.file_id,
            file_name: meta.file_name,
            pages: report.page_count,
            chunks: report.chunk_count,
            uploaded_at: meta.uploaded_at,
        },
    }))
}
