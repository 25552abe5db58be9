use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::api::http::{admin, auth, files};
use crate::state::AppState;

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Build every route of the service around the shared state.
pub fn api_routes(state: Arc<AppState>) -> Router {
    tracing::debug!("Building routes");

    // Reads are public, writes check the caller in their extractors
    let file_routes = Router::new().route(
        "/files/*path",
        get(files::get_file)
            .put(files::put_file)
            .delete(files::delete_file),
    );

    let admin_routes = Router::new().route("/admin/directory", get(admin::get_directory));

    let auth_routes = Router::new().route("/auth/whoami", get(auth::whoami));

    Router::new()
        .route("/health", get(health_check))
        .merge(file_routes)
        .merge(admin_routes)
        .merge(auth_routes)
        .with_state(state)
}
