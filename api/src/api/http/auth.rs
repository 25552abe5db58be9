use crate::api::error::{ApiError, ApiResult};
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;
use axum::{extract::State, Json};
use nostr_file_core::encode_npub;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub pubkey: String,
    pub npub: String,
    pub authorized: bool,
    pub admin: bool,
}

/// Echo the identity proven by the request and what it may do.
pub async fn whoami(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(pubkey): AuthenticatedUser,
) -> ApiResult<Json<WhoAmIResponse>> {
    let npub = encode_npub(&pubkey).map_err(|e| ApiError::internal(e.to_string()))?;
    let snapshot = state.directory.snapshot();

    Ok(Json(WhoAmIResponse {
        authorized: snapshot.is_authorized(&pubkey),
        admin: snapshot.is_admin(&pubkey),
        pubkey,
        npub,
    }))
}
