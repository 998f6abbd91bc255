//! Tool/function calling types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tool definition advertised to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a tool definition taking no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }
}

/// Entry of the `tools` list attached to outbound requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolDefinition,
}

impl From<&ToolDefinition> for LlmTool {
    fn from(definition: &ToolDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function: definition.clone(),
        }
    }
}

/// Tool call issued by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned identifier, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_call_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: default_call_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Set the call id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Name of the tool being called
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Raw JSON argument text
    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }
}

fn default_call_kind() -> String {
    "function".to_string()
}

/// Function name and raw arguments of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default = "empty_arguments", deserialize_with = "arguments_as_text")]
    pub arguments: String,
}

impl FunctionCall {
    /// Whether the arguments are the empty-object marker
    pub fn has_no_arguments(&self) -> bool {
        let trimmed = self.arguments.trim();
        trimmed.is_empty() || trimmed == "{}"
    }
}

fn empty_arguments() -> String {
    "{}".to_string()
}

// Some backends emit arguments as an already-decoded object instead of text.
fn arguments_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => empty_arguments(),
        other => other.to_string(),
    })
}
