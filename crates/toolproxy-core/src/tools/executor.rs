//! Tool execution

use std::sync::Arc;

use serde_json::Value;

use super::handler::{ToolError, ToolResult};
use super::registry::ToolRegistry;
use crate::logging::Logger;
use crate::types::ToolCall;

/// Dispatches matched tool calls to their capabilities
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    logger: Arc<dyn Logger>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self { registry, logger }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one call and return its result as text
    ///
    /// The empty-object marker invokes the tool without arguments; any
    /// other payload must parse as JSON.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult<String> {
        let name = call.name();
        let handler = self
            .registry
            .handler(name)
            .ok_or_else(|| ToolError::NotRegistered(name.to_string()))?;

        let arguments = if call.function.has_no_arguments() {
            None
        } else {
            let parsed: Value = serde_json::from_str(call.arguments()).map_err(|e| {
                ToolError::InvalidArguments(format!("arguments are not valid JSON: {}", e))
            })?;
            Some(parsed)
        };

        self.logger.info(&format!(
            "[ToolExecutor] Executing tool: {} with arguments: {}",
            name,
            call.arguments()
        ));

        let result = handler.call(arguments).await?;
        Ok(match result {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("registry", &self.registry)
            .finish()
    }
}
