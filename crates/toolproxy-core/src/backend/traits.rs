//! Backend trait definition

use async_trait::async_trait;
use bytes::Bytes;

use super::error::{BackendError, BackendResult};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Raw reply from the backend
///
/// The body is kept as bytes so the final answer can be relayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a 200 reply from a JSON value
    pub fn json_ok(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as a chat completion
    pub fn completion(&self) -> BackendResult<ChatCompletionResponse> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BackendError::InvalidResponse(format!("body is not a chat completion: {}", e))
        })
    }
}

/// An upstream model-serving service
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Send one chat-completion request
    ///
    /// Non-2xx replies are returned as `BackendError::Status`.
    async fn chat_completion(&self, request: &ChatCompletionRequest) -> BackendResult<BackendResponse>;
}
