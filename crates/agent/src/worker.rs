//! Worker invoker: one call to the generative worker.
//!
//! The worker sees the system prompt, the transcript and the tool
//! descriptors, and answers either with a final message or with tool-call
//! requests. Tools are never executed here.

use std::sync::Arc;

use chrono::Local;
use sidekick_config::RetryConfig;
use sidekick_core::error::AgentError;
use sidekick_core::message::{Message, MessageToolCall};
use sidekick_core::provider::{Provider, ProviderRequest, ResponseFormat, ToolDefinition};
use sidekick_core::task::Task;
use sidekick_core::tool::ToolCallRequest;
use sidekick_core::turn::{Transcript, Turn};
use tracing::debug;

use crate::prompts;
use crate::retry::complete_with_retry;

/// What one worker call produced.
#[derive(Debug, Clone)]
pub enum WorkerOutput {
    /// A final answer, ready for evaluation
    Answer(Turn),
    /// An intermediate turn requesting one or more tools
    ToolCalls {
        turn: Turn,
        calls: Vec<ToolCallRequest>,
    },
}

impl WorkerOutput {
    pub fn turn(&self) -> &Turn {
        match self {
            WorkerOutput::Answer(turn) | WorkerOutput::ToolCalls { turn, .. } => turn,
        }
    }
}

pub struct WorkerInvoker {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    retry: RetryConfig,
}

impl WorkerInvoker {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Exactly one system message followed by the transcript.
    pub fn build_request(
        &self,
        transcript: &Transcript,
        task: &Task,
        tools: &[ToolDefinition],
        feedback: Option<&str>,
    ) -> ProviderRequest {
        let system = prompts::worker_system_prompt(task.success_criteria(), feedback, Local::now());
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(system));
        messages.extend(transcript.to_messages());

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
            response_format: ResponseFormat::Text,
        }
    }

    /// Call the worker, retrying transient failures.
    pub async fn invoke(
        &self,
        transcript: &Transcript,
        task: &Task,
        tools: &[ToolDefinition],
        feedback: Option<&str>,
    ) -> Result<WorkerOutput, AgentError> {
        let request = self.build_request(transcript, task, tools, feedback);

        let response = complete_with_retry(&self.provider, &request, &self.retry, "worker")
            .await
            .map_err(|exhausted| AgentError::WorkerUnavailable {
                attempts: exhausted.attempts,
                cause: exhausted.error.to_string(),
            })?;

        let message = response.message;
        if message.tool_calls.is_empty() {
            debug!(model = %response.model, chars = message.content.len(), "Worker answered");
            return Ok(WorkerOutput::Answer(Turn::worker(message.content)));
        }

        let calls: Vec<ToolCallRequest> = message.tool_calls.iter().map(to_request).collect();
        debug!(
            model = %response.model,
            tools = ?calls.iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
            "Worker requested tools"
        );

        Ok(WorkerOutput::ToolCalls {
            turn: Turn::worker_tool_calls(message.content, calls.clone()),
            calls,
        })
    }
}

/// Decode a model tool call. Unparsable arguments are kept as a raw string
/// so argument validation reports them back to the worker.
fn to_request(call: &MessageToolCall) -> ToolCallRequest {
    let arguments = if call.arguments.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()))
    };

    let id = if call.id.is_empty() {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    } else {
        call.id.clone()
    };

    ToolCallRequest {
        id,
        tool_name: call.name.clone(),
        arguments,
    }
}
