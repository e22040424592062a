//! File management tools confined to the sandbox directory:
//! `read_file`, `write_file` and `list_directory`.

use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolResult};
use tracing::debug;

use crate::sandbox::Sandbox;

fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

fn denied(tool_name: &str, e: impl std::fmt::Display) -> ToolError {
    ToolError::PermissionDenied {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    }
}

/// Read a text file from the sandbox.
pub struct ReadFileTool {
    sandbox: Sandbox,
}

impl ReadFileTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the sandbox directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file, relative to the sandbox directory"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let resolved = self.sandbox.resolve(path).map_err(|e| denied(self.name(), e))?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(ToolResult::ok(content)),
            Err(e) => Ok(ToolResult::failure(format!("Failed to read file: {e}"))),
        }
    }
}

/// Create or overwrite a file in the sandbox.
pub struct WriteFileTool {
    sandbox: Sandbox,
}

impl WriteFileTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file in the sandbox directory. Creates the file (and parent \
         directories) if needed and overwrites existing content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file, relative to the sandbox directory"
                },
                "content": {
                    "type": "string",
                    "description": "The text to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;
        let resolved = self.sandbox.resolve(path).map_err(|e| denied(self.name(), e))?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failure(format!("Failed to create directory: {e}")));
        }

        debug!(path = %resolved.display(), bytes = content.len(), "Writing sandbox file");

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Successfully wrote {} bytes to {path}",
                content.len()
            ))),
            Err(e) => Ok(ToolResult::failure(format!("Failed to write file: {e}"))),
        }
    }
}

/// List the entries of a sandbox directory.
pub struct ListDirectoryTool {
    sandbox: Sandbox,
}

impl ListDirectoryTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and folders in a sandbox directory. Directories end with '/'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory relative to the sandbox (default: the sandbox root)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".");
        let resolved = self.sandbox.resolve(path).map_err(|e| denied(self.name(), e))?;

        let mut reader = match tokio::fs::read_dir(&resolved).await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to list directory: {e}"))),
        };

        let mut entries = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    entries.push(name);
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(ToolError::ExecutionFailed {
                        tool_name: self.name().into(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        entries.sort();

        let output = if entries.is_empty() {
            "(empty directory)".to_string()
        } else {
            entries.join("\n")
        };
        Ok(ToolResult::ok(output).with_data(serde_json::json!(entries)))
    }
}
