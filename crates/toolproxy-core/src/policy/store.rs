//! Policy store trait

use async_trait::async_trait;
use thiserror::Error;

use super::user::UserPolicy;

/// Errors raised while loading a policy document
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to read policy for '{identity}': {source}")]
    Io {
        identity: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy for '{identity}': {message}")]
    Malformed { identity: String, message: String },
}

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Source of per-identity policy documents
///
/// Implementations:
/// - `FilePolicyStore`: `<dir>/<identity>.yml` on disk
/// - `MemoryPolicyStore`: In-memory for testing
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Store name for diagnostics
    fn name(&self) -> &str;

    /// Load the document for an identity; `Ok(None)` when none exists
    async fn load(&self, identity: &str) -> PolicyResult<Option<UserPolicy>>;
}
