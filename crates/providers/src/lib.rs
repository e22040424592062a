//! Model provider implementations for Sidekick.
//!
//! All providers implement the `sidekick_core::Provider` trait.
//! The router hands the worker and the evaluator their configured backend.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, role_providers};
