//! Conversation state for one in-flight proxy request
//!
//! The state owns the request body that is sent to the backend. It is
//! created from the inbound request, grows by one assistant/tool message
//! pair per executed tool call, and is dropped when the request finishes.

use crate::types::{ChatCompletionRequest, ChatMessage, LlmTool, MessageRole, ToolCall};

/// Separator placed between merged system-message contents
pub const SYSTEM_SEPARATOR: &str = " \n";

/// Ordered message sequence plus the rest of the request body
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    request: ChatCompletionRequest,
}

impl ConversationState {
    /// Take ownership of an inbound request and attach the tool list
    pub fn from_request(mut request: ChatCompletionRequest, tools: Vec<LlmTool>) -> Self {
        request.tools = tools;
        Self { request }
    }

    /// The body to send to the backend
    pub fn request(&self) -> &ChatCompletionRequest {
        &self.request
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.request.messages
    }

    /// Merge `content` into the single system message
    pub fn add_system_message(&mut self, content: &str) {
        self.request.messages = with_system_message(&self.request.messages, content);
    }

    /// Append the assistant message that issued `call`, then the call's result
    ///
    /// The two messages are always appended together and in this order.
    pub fn append_tool_exchange(&mut self, assistant: &ChatMessage, call: &ToolCall, result: String) {
        let tool_message =
            ChatMessage::tool_result(call.name(), result).with_tool_call_id(call.id.clone());
        self.request.messages.reserve(2);
        self.request.messages.push(assistant.clone());
        self.request.messages.push(tool_message);
    }

    pub fn into_request(self) -> ChatCompletionRequest {
        self.request
    }
}

/// Return `messages` with `content` merged into the system message
///
/// The first system message receives `content` after a `" \n"` separator.
/// Any further system messages are folded into the first one, in order, so
/// the result holds at most one. Without a system message, a new one is
/// inserted at the front. The input is left untouched.
pub fn with_system_message(messages: &[ChatMessage], content: &str) -> Vec<ChatMessage> {
    let mut merged: Option<ChatMessage> = None;
    let mut position = 0;
    let mut rest = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role != MessageRole::System {
            rest.push(message.clone());
            continue;
        }
        match merged.as_mut() {
            None => {
                position = rest.len();
                merged = Some(message.clone());
            }
            Some(system) => append_content(system, message.text().unwrap_or_default()),
        }
    }

    let system = match merged {
        Some(mut system) => {
            append_content(&mut system, content);
            system
        }
        None => ChatMessage::system(content),
    };
    rest.insert(position, system);
    rest
}

fn append_content(system: &mut ChatMessage, addition: &str) {
    system.content = Some(match system.content.take() {
        Some(existing) => format!("{}{}{}", existing, SYSTEM_SEPARATOR, addition),
        None => addition.to_string(),
    });
}
