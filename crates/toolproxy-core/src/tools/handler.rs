//! Tool capability trait

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while executing a tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool '{0}' is not registered")]
    NotRegistered(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// An executable tool capability
///
/// `arguments` is `None` when the backend sent the empty-object marker.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Option<Value>) -> ToolResult<Value>;
}

/// Adapter turning a synchronous closure into a `ToolHandler`
pub struct FnHandler<F> {
    func: F,
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Option<Value>) -> ToolResult<Value> + Send + Sync,
{
    async fn call(&self, arguments: Option<Value>) -> ToolResult<Value> {
        (self.func)(arguments)
    }
}

/// Wrap a closure as a tool handler
pub fn from_fn<F>(func: F) -> FnHandler<F>
where
    F: Fn(Option<Value>) -> ToolResult<Value> + Send + Sync,
{
    FnHandler { func }
}
