use crate::storage::FileStore;
use nostr_file_core::{AuthorizationDirectory, ProofValidator, ServerConfig};
use std::sync::Arc;

/// Shared state handed to every handler and extractor.
pub struct AppState {
    pub directory: Arc<AuthorizationDirectory>,
    pub validator: ProofValidator,
    /// When false, authorized and admin routes accept anonymous callers
    pub auth_enabled: bool,
    /// Require the proof's `u` and `method` tags to match the request
    pub bind_request: bool,
    pub store: Arc<dyn FileStore>,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        directory: Arc<AuthorizationDirectory>,
        store: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            directory,
            validator: ProofValidator::new(config.proof),
            auth_enabled: config.authorization.enabled,
            bind_request: config.bind_request,
            store,
        }
    }
}
