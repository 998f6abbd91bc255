//! Policy verdicts

use serde::Serialize;

/// Outcome of a single policy check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Reason text, with a generic fallback for denials without one
    pub fn reason_or_default(&self) -> &str {
        match (&self.reason, self.allowed) {
            (Some(reason), _) => reason,
            (None, true) => "Allowed",
            (None, false) => "Denied by policy.",
        }
    }
}
