//! Error types for the Sidekick domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all Sidekick operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Run-level errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Filesystem and terminal I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)
        )
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Permission denied: {tool_name} — {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Run-level failures of the agent loop.
///
/// `WorkerUnavailable`, `EvaluatorUnavailable`, `AttemptLimitExceeded` and
/// `Cancelled` end a run as `ABORTED`; `MalformedEvaluatorOutput` is always
/// recovered by the evaluator invoker and never reaches the controller.
/// `NotAwaitingClarification` rejects a human reply without touching the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentError {
    #[error("worker unavailable after {attempts} attempt(s): {cause}")]
    WorkerUnavailable { attempts: u32, cause: String },

    #[error("evaluator unavailable after {attempts} attempt(s): {cause}")]
    EvaluatorUnavailable { attempts: u32, cause: String },

    #[error("malformed evaluator output: {raw}")]
    MalformedEvaluatorOutput { raw: String },

    #[error("could not complete after {attempts} attempt(s); last feedback: {last_feedback}")]
    AttemptLimitExceeded { attempts: u32, last_feedback: String },

    #[error("run cancelled by caller")]
    Cancelled,

    #[error("run is not awaiting clarification (status: {status})")]
    NotAwaitingClarification { status: String },
}
