//! Immutable tool registry

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::handler::ToolHandler;
use crate::types::{LlmTool, ToolDefinition};

/// Startup-time registry configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is declared more than once")]
    DuplicateTool(String),

    #[error("tool name must not be empty")]
    EmptyName,
}

/// A tool definition paired with its capability
#[derive(Clone)]
pub struct ToolDeclaration {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDeclaration {
    pub fn new(definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for ToolDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDeclaration")
            .field("name", &self.definition.name)
            .finish()
    }
}

/// Name → capability mapping, fixed after construction
///
/// Membership is the allow-list for a tool's *existence*; whether a caller
/// may use it is decided separately by the user policy.
pub struct ToolRegistry {
    /// Definitions in declaration order
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate or empty names
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = ToolDeclaration>,
    ) -> Result<Self, RegistryError> {
        let mut definitions = Vec::new();
        let mut handlers = HashMap::new();

        for declaration in declarations {
            let name = declaration.definition.name.clone();
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if handlers.insert(name.clone(), declaration.handler).is_some() {
                return Err(RegistryError::DuplicateTool(name));
            }
            definitions.push(declaration.definition);
        }

        Ok(Self {
            definitions,
            handlers,
        })
    }

    /// Registry with no tools; every backend tool call is unregistered
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Tool list attached to outbound requests
    pub fn llm_tools(&self) -> Vec<LlmTool> {
        self.definitions.iter().map(LlmTool::from).collect()
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    /// Registered names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
