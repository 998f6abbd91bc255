//! ToolProxy Core
//!
//! Policy-enforcing tool-call orchestration for OpenAI-compatible
//! chat-completion backends. The server crate wraps this in HTTP; everything
//! here is transport-agnostic apart from the upstream backend client.
//!
//! ## Request flow
//!
//! - The tenant policy screens the inbound conversation
//! - The registry's tools are attached and the request is forwarded
//! - Registered tool calls in the reply are authorized against the caller's
//!   policy document, executed, and appended to the conversation
//! - The loop repeats until the backend answers without registered calls
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolproxy_core::{
//!     builtin_tools, FilePolicyStore, HttpBackend, Orchestrator, TenantPolicy,
//!     ToolRegistry, TracingLogger, UserPolicyEngine, CancellationToken,
//! };
//!
//! let logger = Arc::new(TracingLogger::new());
//! let backend = Arc::new(HttpBackend::new(url, timeout, logger.clone())?);
//! let registry = Arc::new(ToolRegistry::from_declarations(builtin_tools("/app/test_data"))?);
//! let users = UserPolicyEngine::new(Arc::new(FilePolicyStore::new("/app/policies")), logger.clone());
//!
//! let orchestrator = Orchestrator::new(backend, registry, TenantPolicy::default(), users, logger);
//! let reply = orchestrator.run(request, "default_user", &CancellationToken::new()).await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod policy;
pub mod tools;
pub mod backend;
pub mod conversation;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    ChatMessage, MessageRole, ToolCall, FunctionCall, ToolDefinition, LlmTool,
    ChatCompletionRequest, ChatCompletionResponse, Choice, ReplyMessage,
    CancellationToken, DropGuard,
};

pub use logging::{Logger, SharedLogger, NoOpLogger, TracingLogger};

pub use config::{ProxyConfig, ConfigError, ConfigResult};

pub use policy::{
    PolicyDecision, TenantPolicy, UserPolicy, UserPolicyEngine,
    PolicyStore, FilePolicyStore, MemoryPolicyStore,
};

pub use tools::{
    ToolRegistry, ToolDeclaration, ToolHandler, ToolError, ToolExecutor, ToolMatch,
    builtin_tools, match_tool_calls,
};

pub use backend::{Backend, BackendError, BackendResponse, HttpBackend, MockBackend};

pub use conversation::ConversationState;

pub use orchestrator::{LoopLimits, Orchestrator, ProxyError, ProxyResponse, ProxyResult};
