//! Python tool: run a snippet in a fresh interpreter process.
//!
//! Only what the snippet prints comes back, so callers should `print()`
//! the values they need.

use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolResult};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct PythonReplTool {
    python_bin: String,
    working_dir: Option<PathBuf>,
}

impl PythonReplTool {
    pub fn new(python_bin: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
            working_dir: None,
        }
    }

    /// Run snippets from `dir` so relative paths land in the sandbox.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Execute Python code and return what it prints. Use print() to see any value; \
         each call starts a fresh interpreter."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let code = arguments["code"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;

        debug!(bytes = code.len(), "Executing python snippet");

        let mut command = Command::new(&self.python_bin);
        command.arg("-c").arg(code).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!(dir = %dir.display(), error = %e, "Could not create python working dir");
            } else {
                command.current_dir(dir);
            }
        }

        let output = command.output().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: format!("failed to start {}: {e}", self.python_bin),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        let text = if success {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(exit_code = code, "Python snippet failed");
            format!("[exit code: {code}]\n{stdout}\n{stderr}")
        };

        let text = text.trim();
        let text = if success && text.is_empty() {
            "(no output; use print() to return values)"
        } else {
            text
        };

        Ok(ToolResult {
            success,
            output: text.to_string(),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn prints_are_returned() {
        if !python_available() {
            return;
        }
        let tool = PythonReplTool::new("python3");
        let result = tool
            .execute(serde_json::json!({"code": "print(2 + 2)"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "4");
    }

    #[tokio::test]
    async fn silent_snippet_reminds_to_print() {
        if !python_available() {
            return;
        }
        let tool = PythonReplTool::new("python3");
        let result = tool
            .execute(serde_json::json!({"code": "x = 1"}))
            .await
            .unwrap();
        assert!(result.output.contains("print()"));
    }

    #[tokio::test]
    async fn exceptions_are_soft_failures() {
        if !python_available() {
            return;
        }
        let tool = PythonReplTool::new("python3");
        let result = tool
            .execute(serde_json::json!({"code": "raise ValueError('boom')"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("ValueError"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_execution_error() {
        let tool = PythonReplTool::new("definitely-not-a-python-binary");
        let result = tool.execute(serde_json::json!({"code": "print(1)"})).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }
}
