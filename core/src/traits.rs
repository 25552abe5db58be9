use crate::identity::IdentityError;
use async_trait::async_trait;

/// Resolves a fully-qualified username (`local@domain`) to a hex public key.
///
/// The authorization directory depends on this trait rather than on the HTTP
/// client so refreshes can be driven by an in-memory resolver in tests.
///
/// Implementations must return the key as 64 lowercase hex characters, or
/// [`IdentityError::NotFound`] when the domain is unreachable, answers with a
/// non-200 status or malformed JSON, or does not list the local part.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<String, IdentityError>;
}
