// ABOUTME: File routes: public reads, authorized writes, admin deletes
// ABOUTME: Contents go through the FileStore seam held in AppState

use crate::api::error::{ApiError, ApiResult};
use crate::api::extractors::{AdminUser, AuthorizedUser};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    match state.store.get(&path).await? {
        Some(contents) => Ok(contents),
        None => Err(ApiError::not_found(format!("No file at {}", path))),
    }
}

pub async fn put_file(
    State(state): State<Arc<AppState>>,
    AuthorizedUser(caller): AuthorizedUser,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    state.store.put(&path, body.to_vec()).await?;
    tracing::info!(
        path = %path,
        size = body.len(),
        caller = caller.as_deref().unwrap_or("anonymous"),
        "File uploaded"
    );
    Ok(StatusCode::CREATED)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AdminUser(caller): AdminUser,
    Path(path): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store.delete(&path).await? {
        return Err(ApiError::not_found(format!("No file at {}", path)));
    }
    tracing::info!(
        path = %path,
        caller = caller.as_deref().unwrap_or("anonymous"),
        "File deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
