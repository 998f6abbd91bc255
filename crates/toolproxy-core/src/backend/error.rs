//! Backend error types

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while calling the backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not complete within its deadline
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure not raised by the HTTP client
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend answered 2xx with a body that is not a chat completion
    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether resending the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Http(e) => e.is_connect() || e.is_timeout(),
            BackendError::Timeout(_) | BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
