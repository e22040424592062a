//! The task a run works towards.

use serde::{Deserialize, Serialize};

/// Criteria used when the human does not supply any.
pub const DEFAULT_SUCCESS_CRITERIA: &str = "The answer should be clear and accurate";

/// Immutable run input: what to do and how to tell it is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    description: String,
    success_criteria: String,
}

impl Task {
    /// Create a task. Blank criteria fall back to [`DEFAULT_SUCCESS_CRITERIA`].
    pub fn new(description: impl Into<String>, success_criteria: impl Into<String>) -> Self {
        let criteria = success_criteria.into();
        let success_criteria = if criteria.trim().is_empty() {
            DEFAULT_SUCCESS_CRITERIA.to_string()
        } else {
            criteria
        };
        Self {
            description: description.into(),
            success_criteria,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn success_criteria(&self) -> &str {
        &self.success_criteria
    }
}
