use super::error::ApiError;
use super::{parse_id, ListParams, Pagination};
use super::AppState;
use crate::domain::model::{FileRecord, NewFileUpload, UpdateFileRequest, UploadResponse};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileRecord>,
    pub pagination: Pagination,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content = field.bytes().await.map_err(multipart_error)?;

        let record = state
            .files
            .upload_file(NewFileUpload {
                filename,
                content_type,
                content,
            })
            .await
            .map_err(|e| ApiError::service(e, "Failed to upload file"))?;

        return Ok(Json(UploadResponse {
            file_id: record.id.to_string(),
            url: record.url,
        }));
    }

    Err(ApiError::bad_request("No file provided"))
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<FileListResponse>, ApiError> {
    let page = params.page();
    let files = state
        .files
        .list_files(page.limit as i64, page.offset as i64)
        .await
        .map_err(|e| ApiError::service(e, "Failed to retrieve files"))?;

    Ok(Json(FileListResponse {
        pagination: Pagination::new(page, files.len()),
        files,
    }))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .files
        .get_file(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to retrieve file"))?;
    Ok(Json(record))
}

pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateFileRequest>, JsonRejection>,
) -> Result<Json<FileRecord>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    let record = state
        .files
        .update_file(id, req)
        .await
        .map_err(|e| ApiError::service(e, "Failed to update file"))?;
    Ok(Json(record))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let (record, content) = state
        .files
        .download_file(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to download file"))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        record.filename.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state
        .files
        .delete_file(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to delete file"))?;
    Ok(StatusCode::NO_CONTENT)
}
