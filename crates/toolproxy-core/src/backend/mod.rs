//! Upstream chat-completion backend
//!
//! The backend is stateless between calls: every request carries the full
//! conversation. `HttpBackend` talks to an OpenAI-compatible server over
//! HTTP; `MockBackend` replays scripted replies for tests.

mod traits;
mod error;
mod http;
mod mock;

pub use traits::{Backend, BackendResponse};
pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
pub use mock::{completion_with_content, completion_with_tool_calls, MockBackend, MockReply};
