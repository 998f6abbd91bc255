//! Tenant-level content policy

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::decision::PolicyDecision;
use crate::types::ChatMessage;

static DEFAULT_BANNED_KEYWORDS: Lazy<Vec<BannedKeyword>> = Lazy::new(|| {
    vec![BannedKeyword::new("password").with_reason(
        "Policy violation: request contains sensitive keyword 'password'.",
    )]
});

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 20_000;

const TOO_LONG_REASON: &str = "Policy violation: input too long.";

/// A substring that may not appear in any message (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedKeyword {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BannedKeyword {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn reason(&self) -> String {
        self.reason.clone().unwrap_or_else(|| {
            format!(
                "Policy violation: request contains sensitive keyword '{}'.",
                self.keyword
            )
        })
    }
}

/// Content rules applied to every request regardless of caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantPolicy {
    pub banned_keywords: Vec<BannedKeyword>,
    /// Maximum characters per message
    pub max_content_length: usize,
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self {
            banned_keywords: DEFAULT_BANNED_KEYWORDS.clone(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl TenantPolicy {
    /// Scan every message and return the first violation
    ///
    /// Within a message, banned keywords are checked before length.
    pub fn check(&self, messages: &[ChatMessage]) -> PolicyDecision {
        let keywords: Vec<(String, &BannedKeyword)> = self
            .banned_keywords
            .iter()
            .filter(|k| !k.keyword.is_empty())
            .map(|k| (k.keyword.to_lowercase(), k))
            .collect();

        for content in messages.iter().filter_map(ChatMessage::text) {
            let lowered = content.to_lowercase();
            if let Some((_, keyword)) = keywords.iter().find(|(k, _)| lowered.contains(k.as_str())) {
                return PolicyDecision::deny(keyword.reason());
            }
            if content.chars().count() > self.max_content_length {
                return PolicyDecision::deny(TOO_LONG_REASON);
            }
        }
        PolicyDecision::allow()
    }
}
