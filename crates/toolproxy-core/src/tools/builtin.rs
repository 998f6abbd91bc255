//! Built-in tools served by the proxy

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::handler::{ToolError, ToolHandler, ToolResult};
use super::registry::ToolDeclaration;
use crate::types::ToolDefinition;

/// Result text for `file_content` when the file does not exist
pub const FILE_NOT_FOUND: &str = "File not found";

/// Declarations for the standard tool set, reading files from `data_dir`
pub fn builtin_tools(data_dir: impl Into<PathBuf>) -> Vec<ToolDeclaration> {
    let data_dir = data_dir.into();
    vec![
        ToolDeclaration::new(
            ToolDefinition::new("time_now", "Returns current time in ISO format"),
            TimeNow,
        ),
        ToolDeclaration::new(
            ToolDefinition::new(
                "list_directory",
                "Returns a list of files of which the content can be provided to the LLM. \
                 The files concern details about Dutch towns and cities.",
            ),
            ListDirectory::new(&data_dir),
        ),
        ToolDeclaration::new(
            ToolDefinition::new("file_content", "Returns the content").with_parameters(json!({
                "type": "object",
                "properties": {
                    "file_name": {
                        "type": "string",
                        "description": "Name of the file to read content from, \
                                        files can be listed using list_directory tool"
                    }
                }
            })),
            FileContent::new(&data_dir),
        ),
    ]
}

/// Current UTC time in RFC 3339 (ISO-8601) format
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeNow;

#[async_trait]
impl ToolHandler for TimeNow {
    async fn call(&self, _arguments: Option<Value>) -> ToolResult<Value> {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| ToolError::Failed(format!("failed to format time: {}", e)))?;
        Ok(Value::String(now))
    }
}

/// Sorted entry names of the data directory
#[derive(Debug, Clone)]
pub struct ListDirectory {
    dir: PathBuf,
}

impl ListDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ToolHandler for ListDirectory {
    async fn call(&self, _arguments: Option<Value>) -> ToolResult<Value> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(Value::from(names))
    }
}

/// Text content of one file in the data directory
#[derive(Debug, Clone)]
pub struct FileContent {
    dir: PathBuf,
}

impl FileContent {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, file_name: &str) -> ToolResult<PathBuf> {
        let escapes = file_name.is_empty()
            || file_name == "."
            || file_name == ".."
            || file_name.contains(['/', '\\', '\0']);
        if escapes {
            return Err(ToolError::InvalidArguments(format!(
                "file_name '{}' must name a file inside the data directory",
                file_name
            )));
        }
        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl ToolHandler for FileContent {
    async fn call(&self, arguments: Option<Value>) -> ToolResult<Value> {
        let file_name = arguments
            .as_ref()
            .and_then(|args| args.get("file_name"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::InvalidArguments("missing string argument 'file_name'".to_string())
            })?;

        let path = self.resolve(file_name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(Value::String(FILE_NOT_FOUND.to_string())),
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Value::String(content))
    }
}
