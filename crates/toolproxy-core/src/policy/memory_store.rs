//! In-memory policy store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::store::{PolicyResult, PolicyStore};
use super::user::UserPolicy;

/// Policy store backed by a map, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<HashMap<String, UserPolicy>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the document for an identity
    pub fn insert(&self, identity: impl Into<String>, policy: UserPolicy) {
        self.policies.write().insert(identity.into(), policy);
    }

    pub fn remove(&self, identity: &str) -> Option<UserPolicy> {
        self.policies.write().remove(identity)
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, identity: &str) -> PolicyResult<Option<UserPolicy>> {
        Ok(self.policies.read().get(identity).cloned())
    }
}
