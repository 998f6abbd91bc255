//! Tool call matching

use crate::types::{ChatCompletionResponse, ChatMessage, ToolCall};

use super::registry::ToolRegistry;

/// Result of intersecting a backend reply with the registry
#[derive(Debug, Clone, PartialEq)]
pub enum ToolMatch {
    /// The reply requested no tools; it is the final answer
    NoToolCalls,
    /// Every requested tool is unknown; nothing can be executed
    OnlyUnregistered { names: Vec<String> },
    /// At least one requested tool is registered
    Matched {
        /// The assistant message that issued the calls, verbatim
        assistant_message: ChatMessage,
        /// Registered calls, in the order the backend issued them
        calls: Vec<ToolCall>,
        /// Requested names that are not registered
        unregistered: Vec<String>,
    },
}

impl ToolMatch {
    /// Whether the loop has tools to run for this reply
    pub fn has_calls(&self) -> bool {
        matches!(self, ToolMatch::Matched { .. })
    }
}

/// Match the first choice's tool calls against the registry
pub fn match_tool_calls(response: &ChatCompletionResponse, registry: &ToolRegistry) -> ToolMatch {
    let Some(message) = response.first_message() else {
        return ToolMatch::NoToolCalls;
    };
    let requested = message.calls();
    if requested.is_empty() {
        return ToolMatch::NoToolCalls;
    }

    let (calls, unknown): (Vec<&ToolCall>, Vec<&ToolCall>) =
        requested.iter().partition(|call| registry.contains(call.name()));
    let unregistered: Vec<String> = unknown.iter().map(|c| c.name().to_string()).collect();

    if calls.is_empty() {
        return ToolMatch::OnlyUnregistered {
            names: unregistered,
        };
    }

    ToolMatch::Matched {
        assistant_message: message.to_assistant_message(),
        calls: calls.into_iter().cloned().collect(),
        unregistered,
    }
}
