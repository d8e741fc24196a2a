//! File drop handlers.
//!
//! # Endpoints
//!
//! - `POST /files?name=<name>` - Upload the raw request body (sign-in required)
//! - `GET /files` - List file metadata, newest first
//! - `GET /files/{id}` - Download a file
//! - `DELETE /files/{id}` - Delete a file (owner or admin)

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use super::util::parse_id;
use crate::error::AppResult;
use crate::identity::Caller;
use crate::models::{
    DEFAULT_CONTENT_TYPE, DeletedResponse, FileListResponse, ListQuery, StoredFile, UploadQuery,
};
use crate::state::AppState;

#[instrument(skip(state, caller, headers, body), fields(size = body.len()))]
pub async fn upload_file(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<StoredFile>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let file = state
        .files
        .upload(&caller, &query.name, content_type, body)
        .await?;

    Ok((StatusCode::CREATED, Json(file)))
}

#[instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<FileListResponse> {
    let limit = query.effective_limit(state.config.message_list_max);
    let files = state.files.list(limit).await;

    Json(FileListResponse {
        count: files.len(),
        files,
    })
}

/// Download a file's payload with its stored content type.
///
/// Browsers are told not to sniff the payload, so an upload labelled
/// `text/plain` is never rendered as HTML.
#[instrument(skip(state))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let file = state.files.get(parse_id(&id)?).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        file.name.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        file.data,
    )
        .into_response())
}

#[instrument(skip(state, caller))]
pub async fn delete_file(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    let id = parse_id(&id)?;
    state.files.delete(&caller, id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
