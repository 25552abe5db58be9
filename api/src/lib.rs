// ABOUTME: HTTP layer for the nostr-file service built on axum
// ABOUTME: Exports the router, shared state, NIP-98 extractors, and the file-store seam

pub mod api;
pub mod state;
pub mod storage;

pub use api::error::{ApiError, ApiResult};
pub use api::http::routes::api_routes;
pub use state::AppState;
pub use storage::{FileStore, LocalFileStore, MemoryFileStore, StorageError};
