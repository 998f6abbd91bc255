//! Core types for chat-completion proxying
//!
//! Wire shapes follow the OpenAI-compatible chat-completions API that the
//! upstream backend speaks. Fields the proxy does not interpret are kept
//! verbatim so they survive the round trip to the backend.

mod message;
mod tool;
mod completion;
mod cancellation;

pub use message::{ChatMessage, MessageRole};
pub use tool::{FunctionCall, LlmTool, ToolCall, ToolDefinition};
pub use completion::{ChatCompletionRequest, ChatCompletionResponse, Choice, ReplyMessage};
pub use cancellation::{CancellationToken, DropGuard};
