//! The evaluator's judgement of one evaluation cycle.

use serde::{Deserialize, Serialize};

/// Structured evaluator output.
///
/// At most one of `criteria_met` and `needs_clarification` is true; both
/// false means "retry with feedback". A verdict is produced fresh every
/// cycle and never merged with an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub criteria_met: bool,
    pub needs_clarification: bool,
    pub feedback: String,
}

impl Verdict {
    pub fn met(feedback: impl Into<String>) -> Self {
        Self {
            criteria_met: true,
            needs_clarification: false,
            feedback: feedback.into(),
        }
    }

    pub fn clarify(question: impl Into<String>) -> Self {
        Self {
            criteria_met: false,
            needs_clarification: true,
            feedback: question.into(),
        }
    }

    pub fn retry(feedback: impl Into<String>) -> Self {
        Self {
            criteria_met: false,
            needs_clarification: false,
            feedback: feedback.into(),
        }
    }

    /// Neither success nor a question for the human.
    pub fn is_retry(&self) -> bool {
        !self.criteria_met && !self.needs_clarification
    }
}
