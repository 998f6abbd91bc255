//! Orchestration outcomes that end a request without a relayed answer

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::tools::ToolError;

/// Why a proxied request did not produce a backend answer
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Conversation content broke a tenant rule; the backend was not called
    #[error("{reason}")]
    TenantPolicyViolation { reason: String },

    /// The caller may not use a tool the backend requested
    #[error("Forbidden: tool '{tool}' denied for '{identity}': {reason}")]
    UserPolicyViolation {
        identity: String,
        tool: String,
        reason: String,
    },

    /// A registered tool failed while executing
    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: ToolError,
    },

    /// The upstream call failed
    #[error("backend request failed: {0}")]
    Backend(#[from] BackendError),

    /// The upstream answered 2xx with something that is not a completion
    #[error("invalid backend response: {0}")]
    InvalidBackendResponse(String),

    /// The backend kept requesting tools past the round cap
    #[error("tool loop exceeded the limit of {max_rounds} rounds")]
    LoopBoundExceeded { max_rounds: u32 },

    /// The request used up its total time budget
    #[error("request exceeded its time budget of {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller went away
    #[error("request cancelled")]
    Cancelled,
}

impl ProxyError {
    /// HTTP status for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::TenantPolicyViolation { .. } | ProxyError::UserPolicyViolation { .. } => 403,
            _ => 500,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::TenantPolicyViolation { .. } => "tenant_policy_violation",
            ProxyError::UserPolicyViolation { .. } => "user_policy_violation",
            ProxyError::ToolExecution { .. } => "tool_execution_error",
            ProxyError::Backend(_) => "backend_transport_error",
            ProxyError::InvalidBackendResponse(_) => "invalid_backend_response",
            ProxyError::LoopBoundExceeded { .. } => "loop_bound_exceeded",
            ProxyError::DeadlineExceeded(_) => "deadline_exceeded",
            ProxyError::Cancelled => "cancelled",
        }
    }

    /// The tool involved, for policy denials and tool failures
    pub fn tool(&self) -> Option<&str> {
        match self {
            ProxyError::UserPolicyViolation { tool, .. } | ProxyError::ToolExecution { tool, .. } => {
                Some(tool)
            }
            _ => None,
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
