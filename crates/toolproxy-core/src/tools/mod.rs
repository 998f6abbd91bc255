//! Tool management module
//!
//! Tools are locally executable capabilities the backend may request by
//! name. The flow for one backend reply is:
//!
//! ```text
//! backend reply ──▶ matcher ──▶ (user policy) ──▶ executor ──▶ conversation
//!                     │
//!                     └─ intersects requested names with the ToolRegistry
//! ```
//!
//! The registry is built once at startup from a declaration list and is
//! read-only afterwards; it is passed explicitly to whoever needs it.

mod handler;
mod registry;
mod builtin;
mod matcher;
mod executor;

pub use handler::{from_fn, FnHandler, ToolError, ToolHandler, ToolResult};
pub use registry::{RegistryError, ToolDeclaration, ToolRegistry};
pub use builtin::{builtin_tools, FileContent, ListDirectory, TimeNow, FILE_NOT_FOUND};
pub use matcher::{match_tool_calls, ToolMatch};
pub use executor::ToolExecutor;
