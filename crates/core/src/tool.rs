//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the worker the ability to act in the world: search
//! the web, fetch pages, run Python, read and write files, send push
//! notifications. All of them share one capability, [`Tool::execute`]; they
//! differ only in the metadata they register with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool, emitted by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments as a JSON value (normally an object)
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core Tool trait.
///
/// Tools are registered in the [`ToolRegistry`] and made available to the
/// worker through their [`ToolDefinition`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search", "python_repl").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model verbatim).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Release any resources held by the tool (browsers, child processes).
    async fn shutdown(&self) {}

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>;
type Handler = Box<dyn Fn(serde_json::Value) -> HandlerFuture + Send + Sync>;

/// A tool assembled from registered metadata and a plain async handler.
struct FnTool {
    name: String,
    description: String,
    schema: serde_json::Value,
    handler: Handler,
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        (self.handler)(arguments).await.map(ToolResult::ok)
    }
}

/// A registry of available tools, in registration order.
///
/// The registry is read-mostly: it is built once, wrapped in an `Arc` and
/// shared by every run. The agent loop uses it to:
/// 1. List tool descriptors to send to the worker
/// 2. Resolve tools by name when the worker requests them
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name,
    /// keeping its position.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        let tool: Arc<dyn Tool> = Arc::from(tool);
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register a tool from its metadata and an async handler.
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: F,
    ) where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.register(Box::new(FnTool {
            name: name.into(),
            description: description.into(),
            schema: input_schema,
            handler: Box::new(move |args| Box::pin(handler(args))),
        }));
    }

    /// Resolve a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&slot| self.tools[slot].clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Get all tool definitions, in registration order.
    pub fn list_descriptors(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Give every tool a chance to release its resources.
    pub async fn shutdown(&self) {
        for tool in &self.tools {
            tool.shutdown().await;
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `arguments` against the object shape and `required` keys of a
/// JSON Schema. Property types are left to the tool itself.
pub fn validate_arguments(
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> Result<(), ToolError> {
    let Some(object) = arguments.as_object() else {
        return Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {arguments}"
        )));
    };

    let missing: Vec<&str> = schema["required"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|key| key.as_str())
        .filter(|key| !object.contains_key(*key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "missing required argument(s): {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult::ok(text))
        }
    }

    #[test]
    fn registry_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.resolve("echo").is_ok());
        assert!(matches!(
            registry.resolve("nonexistent"),
            Err(ToolError::NotFound(name)) if name == "nonexistent"
        ));
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("zeta", "last letter", serde_json::json!({}), |_| async {
            Ok("z".to_string())
        });
        registry.register(Box::new(EchoTool));
        registry.register_fn("alpha", "first letter", serde_json::json!({}), |_| async {
            Ok("a".to_string())
        });

        let names: Vec<_> = registry.list_descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "echo", "alpha"]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register_fn("other", "x", serde_json::json!({}), |_| async { Ok(String::new()) });
        registry.register_fn("echo", "replacement", serde_json::json!({}), |_| async {
            Ok("replaced".to_string())
        });

        assert_eq!(registry.len(), 2);
        let defs = registry.list_descriptors();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].description, "replacement");
    }

    #[tokio::test]
    async fn fn_tool_executes_handler() {
        let mut registry = ToolRegistry::new();
        registry.register_fn(
            "shout",
            "Uppercases text",
            serde_json::json!({"type": "object", "required": ["text"]}),
            |args| async move {
                Ok(args["text"].as_str().unwrap_or_default().to_uppercase())
            },
        );

        let tool = registry.resolve("shout").unwrap();
        let result = tool.execute(serde_json::json!({"text": "hi"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "HI");
    }

    #[test]
    fn validate_rejects_missing_required() {
        let schema = EchoTool.parameters_schema();
        let err = validate_arguments(&schema, &serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("text"));
        assert!(validate_arguments(&schema, &serde_json::json!({"text": "x"})).is_ok());
    }

    #[test]
    fn validate_rejects_non_object() {
        let schema = EchoTool.parameters_schema();
        let err = validate_arguments(&schema, &serde_json::json!("oops")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
