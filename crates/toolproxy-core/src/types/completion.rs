//! Chat-completion request and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::ChatMessage;
use super::tool::{LlmTool, ToolCall};

/// Inbound chat-completion request, forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Tools the backend may invoke; replaced by the proxy's registry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<LlmTool>,
    /// Sampling parameters and anything else the client sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// Create a request from a message list
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: None,
            messages,
            tools: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// View of a backend reply, used for tool-call matching
///
/// Only `tool_calls` is interpreted. Everything else in the message is kept
/// as raw JSON, so replies with an omitted role or structured content still
/// parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// The assistant message of the first choice, if present
    pub fn first_message(&self) -> Option<&ReplyMessage> {
        self.choices.first().and_then(|c| c.message.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ReplyMessage>,
}

/// Message of a backend choice
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Every other field, uninterpreted
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

// Keys that map onto typed `ChatMessage` fields
const TYPED_KEYS: [&str; 5] = ["role", "content", "name", "tool_calls", "tool_call_id"];

impl ReplyMessage {
    /// Tool calls carried by this message (empty when absent)
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Content when it is plain text
    pub fn text(&self) -> Option<&str> {
        self.rest.get("content").and_then(Value::as_str)
    }

    /// The assistant message to echo back into the conversation
    ///
    /// Array content is flattened to the text of its parts.
    pub fn to_assistant_message(&self) -> ChatMessage {
        let mut message = ChatMessage::assistant_tool_calls(self.calls().to_vec());
        message.content = self.rest.get("content").and_then(content_text);
        message.extra = self
            .rest
            .iter()
            .filter(|(key, _)| !TYPED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        message
    }
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            (!texts.is_empty()).then(|| texts.concat())
        }
        _ => None,
    }
}
