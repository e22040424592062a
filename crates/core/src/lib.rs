//! # Sidekick Core
//!
//! Domain types, traits, and error definitions for the Sidekick task agent.
//! This crate has **no HTTP or runtime dependencies** beyond `tokio::sync` —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The generative worker, the generative evaluator, every tool and the
//! completion notifier are collaborators behind a trait defined here.
//! Implementations live in their respective crates. This enables:
//! - Swapping model backends via configuration
//! - Deterministic testing with scripted stand-ins
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod notify;
pub mod provider;
pub mod run;
pub mod task;
pub mod tool;
pub mod turn;
pub mod verdict;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, NotifyError, ProviderError, Result, ToolError};
pub use event::{EventBus, RunEvent};
pub use message::{Message, MessageToolCall, Role};
pub use notify::{Notifier, NoopNotifier};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition, Usage};
pub use run::{RunState, RunStatus};
pub use task::{DEFAULT_SUCCESS_CRITERIA, Task};
pub use tool::{Tool, ToolCallRequest, ToolRegistry, ToolResult};
pub use turn::{Transcript, Turn, TurnRole};
pub use verdict::Verdict;
