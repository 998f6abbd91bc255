//! Per-identity tool authorization

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::decision::PolicyDecision;
use super::store::PolicyStore;
use crate::logging::Logger;

const NOT_ALLOWED_REASON: &str = "Tool not allowed by user policy.";
const PENDING_REASON: &str = "No user policy found; tool authorization pending.";

/// Per-identity policy document
///
/// ```yaml
/// tools:
///   time_now:
///     allowed: true
///   file_content:
///     allowed: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPolicy {
    #[serde(default)]
    pub tools: HashMap<String, ToolPermission>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPermission {
    #[serde(default)]
    pub allowed: bool,
}

impl UserPolicy {
    /// Parse a YAML policy document; an empty document grants nothing
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Grant or revoke a tool
    pub fn with_tool(mut self, name: impl Into<String>, allowed: bool) -> Self {
        self.tools.insert(name.into(), ToolPermission { allowed });
        self
    }

    /// Whether the document explicitly allows the tool
    pub fn allows(&self, tool: &str) -> bool {
        self.tools.get(tool).is_some_and(|p| p.allowed)
    }
}

/// Checks tool calls against the caller's policy document
pub struct UserPolicyEngine {
    store: Arc<dyn PolicyStore>,
    logger: Arc<dyn Logger>,
}

impl UserPolicyEngine {
    pub fn new(store: Arc<dyn PolicyStore>, logger: Arc<dyn Logger>) -> Self {
        Self { store, logger }
    }

    /// Decide whether `identity` may invoke `tool`
    ///
    /// The document is loaded fresh for every check. A missing document, a
    /// missing entry, or an unreadable document all deny.
    pub async fn check(&self, identity: &str, tool: &str) -> PolicyDecision {
        match self.store.load(identity).await {
            Ok(Some(policy)) if policy.allows(tool) => PolicyDecision::allow(),
            Ok(Some(_)) => PolicyDecision::deny(NOT_ALLOWED_REASON),
            Ok(None) => {
                self.logger.debug(&format!(
                    "[UserPolicy] No policy document for identity '{}'",
                    identity
                ));
                PolicyDecision::deny(PENDING_REASON)
            }
            Err(e) => {
                self.logger.error(&format!(
                    "[UserPolicy] Failed to load policy for identity '{}': {}",
                    identity, e
                ));
                PolicyDecision::deny(format!("User policy unavailable: {}", e))
            }
        }
    }
}

impl std::fmt::Debug for UserPolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPolicyEngine")
            .field("store", &self.store.name())
            .finish()
    }
}
