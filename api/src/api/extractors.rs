// ABOUTME: Request extractors that turn a NIP-98 Authorization header into a caller identity
// ABOUTME: AuthorizedUser and AdminUser additionally consult the authorization directory

use crate::api::error::ApiError;
use crate::state::AppState;
use axum::http::header::AUTHORIZATION;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use nostr_file_core::nip98::check_request_binding;
use std::sync::Arc;

/// Caller that presented a valid proof. Holds the hex pubkey.
pub struct AuthenticatedUser(pub String);

/// Caller allowed to write. `None` when auth is disabled.
pub struct AuthorizedUser(pub Option<String>);

/// Caller allowed to administer. `None` when auth is disabled.
pub struct AdminUser(pub Option<String>);

fn authenticate(parts: &Parts, state: &AppState) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let event = state.validator.validate_header(header)?;

    if state.bind_request {
        check_request_binding(&event, parts.method.as_str(), &parts.uri.to_string())?;
    }

    tracing::debug!(pubkey = %event.pubkey, "Authenticated via NIP-98");
    Ok(event.pubkey.to_ascii_lowercase())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(AuthenticatedUser)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthorizedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.auth_enabled {
            return Ok(AuthorizedUser(None));
        }

        let pubkey = authenticate(parts, state)?;
        if !state.directory.is_authorized(&pubkey) {
            tracing::info!(pubkey = %pubkey, "Rejected unauthorized caller");
            return Err(ApiError::forbidden("Not authorized"));
        }
        Ok(AuthorizedUser(Some(pubkey)))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.auth_enabled {
            return Ok(AdminUser(None));
        }

        let pubkey = authenticate(parts, state)?;
        if !state.directory.is_admin(&pubkey) {
            tracing::info!(pubkey = %pubkey, "Rejected non-admin caller");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(Some(pubkey)))
    }
}
