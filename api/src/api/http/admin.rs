use crate::api::extractors::AdminUser;
use crate::state::AppState;
use axum::{extract::State, Json};
use nostr_file_core::DirectorySnapshot;
use std::sync::Arc;

/// Current authorized and admin pubkeys.
pub async fn get_directory(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Json<DirectorySnapshot> {
    let snapshot = state.directory.snapshot();
    Json(snapshot.as_ref().clone())
}
