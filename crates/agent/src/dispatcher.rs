//! Tool dispatcher: executes the tool calls of one worker turn.
//!
//! Every request yields exactly one observation turn, in request order,
//! whether the tool succeeded, failed, was unknown or timed out. Nothing a
//! tool does can end the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use sidekick_config::LoopConfig;
use sidekick_core::error::ToolError;
use sidekick_core::provider::ToolDefinition;
use sidekick_core::tool::{ToolCallRequest, ToolRegistry, ToolResult, validate_arguments};
use sidekick_core::turn::Turn;
use tracing::{debug, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    concurrent: bool,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(60),
            concurrent: true,
        }
    }

    pub fn from_config(registry: Arc<ToolRegistry>, config: &LoopConfig) -> Self {
        Self::new(registry)
            .with_timeout(config.tool_timeout())
            .with_concurrency(config.concurrent_tools)
    }

    /// Per-call upper bound on tool execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the calls of one turn concurrently (`true`) or one after another.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn descriptors(&self) -> Vec<ToolDefinition> {
        self.registry.list_descriptors()
    }

    /// Execute `calls` and return one tool turn per call, in request order.
    pub async fn dispatch(&self, calls: &[ToolCallRequest]) -> Vec<Turn> {
        if self.concurrent {
            join_all(calls.iter().map(|call| self.observe(call))).await
        } else {
            let mut turns = Vec::with_capacity(calls.len());
            for call in calls {
                turns.push(self.observe(call).await);
            }
            turns
        }
    }

    async fn observe(&self, call: &ToolCallRequest) -> Turn {
        let start = Instant::now();
        let result = match self.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.tool_name, call_id = %call.id, error = %e, "Tool call failed");
                ToolResult::failure(observation_for(&e))
            }
        };
        debug!(
            tool = %call.tool_name,
            success = result.success,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool call finished"
        );
        Turn::tool(call, result)
    }

    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolResult, ToolError> {
        let tool = self.registry.resolve(&call.tool_name)?;
        validate_arguments(&tool.parameters_schema(), &call.arguments)?;

        match tokio::time::timeout(self.timeout, tool.execute(call.arguments.clone())).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: call.tool_name.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// The text the worker sees for a failed call.
fn observation_for(error: &ToolError) -> String {
    match error {
        ToolError::NotFound(name) => format!("Error: tool '{name}' is unavailable"),
        other => format!("Error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidekick_core::turn::TurnRole;

    fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            tool_name: name.into(),
            arguments: args,
        }
    }

    fn sleepy_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_fn(
            "sleep",
            "Sleep for ms then echo the label",
            serde_json::json!({
                "type": "object",
                "properties": { "ms": { "type": "integer" }, "label": { "type": "string" } },
                "required": ["ms", "label"]
            }),
            |args| async move {
                let ms = args["ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(args["label"].as_str().unwrap_or_default().to_string())
            },
        );
        registry.register_fn(
            "explode",
            "Always fails",
            serde_json::json!({"type": "object"}),
            |_| async move {
                Err(ToolError::ExecutionFailed {
                    tool_name: "explode".into(),
                    reason: "boom".into(),
                })
            },
        );
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_request_order_not_completion_order() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()));
        let orderings: [[u64; 3]; 6] = [
            [10, 100, 300],
            [10, 300, 100],
            [100, 10, 300],
            [100, 300, 10],
            [300, 10, 100],
            [300, 100, 10],
        ];

        for latencies in orderings {
            let calls: Vec<_> = latencies
                .iter()
                .zip(["a", "b", "c"])
                .map(|(ms, id)| call(id, "sleep", serde_json::json!({"ms": ms, "label": format!("{id}:{ms}")})))
                .collect();

            let turns = dispatcher.dispatch(&calls).await;
            let outputs: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
            let expected: Vec<String> = latencies
                .iter()
                .zip(["a", "b", "c"])
                .map(|(ms, id)| format!("{id}:{ms}"))
                .collect();
            assert_eq!(outputs, expected, "latencies {latencies:?}");
            let ids: Vec<_> = turns.iter().map(|t| t.tool_call_id.clone().unwrap()).collect();
            assert_eq!(ids, vec!["a", "b", "c"], "latencies {latencies:?}");
            assert!(turns.iter().all(|t| t.role == TurnRole::Tool));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_overlap() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()));
        let calls = vec![
            call("a", "sleep", serde_json::json!({"ms": 500, "label": "x"})),
            call("b", "sleep", serde_json::json!({"ms": 500, "label": "y"})),
        ];

        let start = tokio::time::Instant::now();
        dispatcher.dispatch(&calls).await;
        assert!(start.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_mode_keeps_order() {
        let dispatcher =
            ToolDispatcher::new(Arc::new(sleepy_registry())).with_concurrency(false);
        let calls = vec![
            call("a", "sleep", serde_json::json!({"ms": 50, "label": "one"})),
            call("b", "sleep", serde_json::json!({"ms": 5, "label": "two"})),
        ];

        let start = tokio::time::Instant::now();
        let turns = dispatcher.dispatch(&calls).await;
        assert!(start.elapsed() >= Duration::from_millis(55));
        assert_eq!(turns[0].content, "one");
        assert_eq!(turns[1].content, "two");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_single_error_observation() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()))
            .with_timeout(Duration::from_secs(1));
        let calls = vec![call("slow", "sleep", serde_json::json!({"ms": 5_000, "label": "late"}))];

        let turns = dispatcher.dispatch(&calls).await;
        assert_eq!(turns.len(), 1);
        let result = turns[0].tool_result.as_ref().unwrap();
        assert!(!result.success);
        assert!(turns[0].content.contains("timed out"), "{}", turns[0].content);
        assert!(!turns[0].content.contains("late"));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_observation() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()));
        let turns = dispatcher
            .dispatch(&[call("t", "teleport", serde_json::json!({"to": "mars"}))])
            .await;

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "Error: tool 'teleport' is unavailable");
        assert_eq!(turns[0].tool_name.as_deref(), Some("teleport"));
    }

    #[tokio::test]
    async fn invalid_arguments_skip_execution() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()));
        let turns = dispatcher
            .dispatch(&[
                call("m", "sleep", serde_json::json!({"ms": 1})),
                call("s", "sleep", serde_json::json!("not an object")),
            ])
            .await;

        assert!(turns[0].content.contains("missing required argument(s): label"));
        assert!(turns[1].content.contains("expected a JSON object"));
    }

    #[tokio::test]
    async fn execution_errors_become_text() {
        let dispatcher = ToolDispatcher::new(Arc::new(sleepy_registry()));
        let turns = dispatcher
            .dispatch(&[call("e", "explode", serde_json::json!({}))])
            .await;
        assert!(turns[0].content.starts_with("Error: Tool execution failed: explode"));
        assert!(turns[0].content.contains("boom"));
    }
}
