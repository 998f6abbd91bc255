//! Mock backend for testing
//!
//! Replies are consumed in order; an optional fallback reply is returned
//! once the script runs out. Every request is recorded for inspection.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::error::{BackendError, BackendResult};
use super::traits::{Backend, BackendResponse};
use crate::types::ChatCompletionRequest;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with a JSON body
    Json(Value),
    /// Non-success status with a JSON body
    Status(u16, Value),
    /// 200 with a raw body
    Raw(String),
    /// Transport failure
    Fail(String),
}

/// Scripted backend
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    delay: Duration,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 reply
    pub fn reply(self, body: Value) -> Self {
        self.then(MockReply::Json(body))
    }

    /// Queue any reply
    pub fn then(self, reply: MockReply) -> Self {
        self.script.lock().push_back(reply);
        self
    }

    /// Reply used once the script is exhausted
    pub fn repeat(mut self, body: Value) -> Self {
        self.fallback = Some(MockReply::Json(body));
        self
    }

    /// Delay every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.script.lock().pop_front().or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat_completion(&self, request: &ChatCompletionRequest) -> BackendResult<BackendResponse> {
        self.requests.lock().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.next_reply() {
            Some(MockReply::Json(body)) => Ok(BackendResponse::json_ok(&body)),
            Some(MockReply::Raw(body)) => Ok(BackendResponse::new(200, body)),
            Some(MockReply::Status(status, body)) => Err(BackendError::status(status, body.to_string())),
            Some(MockReply::Fail(message)) => Err(BackendError::Transport(message)),
            None => Err(BackendError::Other("mock backend has no scripted reply".to_string())),
        }
    }
}

/// A final assistant answer with no tool calls
pub fn completion_with_content(content: &str) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// An assistant reply requesting `(name, arguments)` tool calls in order
pub fn completion_with_tool_calls(calls: &[(&str, &str)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, arguments))| {
            json!({
                "id": format!("call_{}", i),
                "type": "function",
                "function": { "name": name, "arguments": arguments }
            })
        })
        .collect();
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": null, "tool_calls": tool_calls },
            "finish_reason": "tool_calls"
        }]
    })
}
