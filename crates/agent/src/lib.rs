//! The Sidekick agent loop.
//!
//! A run alternates between a **worker** that may call tools and an
//! **evaluator** that judges the worker's answer against the success
//! criteria:
//!
//! 1. **Worker** answers, or requests tools
//! 2. **Dispatcher** runs requested tools and appends observations, back to 1
//! 3. **Evaluator** judges the final answer: done, ask the human, or retry
//!    with feedback
//!
//! The loop ends when the criteria are met, a question is put to the human,
//! or the attempt limit is reached.

pub mod controller;
pub mod dispatcher;
pub mod evaluator;
pub mod prompts;
pub mod retry;
pub mod session;
pub mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod test_helpers;

pub use controller::{AgentController, DEFAULT_MAX_ATTEMPTS, RunHandle};
pub use dispatcher::ToolDispatcher;
pub use evaluator::{EvaluatorInvoker, parse_verdict};
pub use session::{ChatEntry, ChatRole, Sidekick};
pub use worker::{WorkerInvoker, WorkerOutput};
