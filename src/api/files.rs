use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use super::dto::{FileListResponse, FileResponse, MessageResponse};
use super::error::ApiError;
use super::routes::AppState;
use crate::auth::RequestUser;

const FILE_NOT_FOUND: &str = "No file found with the provided ID";

#[utoipa::path(
    get,
    path = "/api/files",
    responses((status = 200, description = "Files uploaded by the caller, newest first", body = FileListResponse))
)]
pub async fn list_files(
    State(state): State<AppState>,
    user: RequestUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state
        .files
        .list_files(user.id())
        .await
        .map_err(|e| ApiError::upstream("Failed to list files", e, state.development()))?;

    Ok(Json(FileListResponse {
        success: true,
        data: files,
    }))
}

#[utoipa::path(
    get,
    path = "/api/files/{file_id}",
    params(("file_id" = String, Path, description = "File identifier returned by the upload")),
    responses(
        (status = 200, description = "File with its reassembled text", body = FileResponse),
        (status = 404, description = "Unknown file, or owned by another user", body = super::dto::ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    user: RequestUser,
    Path(file_id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let file = state
        .files
        .get_file(user.id(), &file_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to get file", e, state.development()))?
        .ok_or_else(|| ApiError::NotFound(FILE_NOT_FOUND.to_string()))?;

    Ok(Json(FileResponse {
        success: true,
        data: file,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/files/{file_id}",
    params(("file_id" = String, Path, description = "File identifier returned by the upload")),
    responses(
        (status = 200, description = "All chunks of the file removed", body = MessageResponse),
        (status = 404, description = "Unknown file, or owned by another user", body = super::dto::ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    user: RequestUser,
    Path(file_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .files
        .delete_file(user.id(), &file_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete file", e, state.development()))?;

    if !deleted {
        return Err(ApiError::NotFound(FILE_NOT_FOUND.to_string()));
    }

    info!(file_id = %file_id, user_id = user.id(), "File deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}
