//! Run state: the controller's serializable working state.
//!
//! A suspended run is nothing more than a [`RunState`] whose status is
//! [`RunStatus::AwaitingClarification`]; it can be written out with serde
//! and handed back later to resume.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;
use crate::task::Task;
use crate::turn::{Transcript, Turn};
use crate::verdict::Verdict;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// Suspended until a human reply arrives
    AwaitingClarification { question: String },
    /// The evaluator accepted the work
    Done { summary: String },
    Aborted { reason: AgentError },
}

impl RunStatus {
    /// Short machine-friendly name of the state.
    pub fn kind(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::AwaitingClarification { .. } => "awaiting_clarification",
            RunStatus::Done { .. } => "done",
            RunStatus::Aborted { .. } => "aborted",
        }
    }

    /// `Done` and `Aborted` accept no further input.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done { .. } | RunStatus::Aborted { .. })
    }

    /// Human-readable explanation of the state.
    pub fn explanation(&self) -> String {
        match self {
            RunStatus::Running => "The task is still being worked on.".to_string(),
            RunStatus::AwaitingClarification { question } => {
                format!("Clarification needed: {question}")
            }
            RunStatus::Done { summary } => format!("Success criteria met: {summary}"),
            RunStatus::Aborted { reason } => format!("Run aborted: {reason}"),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Everything the controller needs to continue a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub task: Task,
    pub transcript: Transcript,
    /// Number of "not satisfied" verdicts so far
    pub attempt_count: u32,
    pub last_verdict: Option<Verdict>,
    pub status: RunStatus,
}

impl RunState {
    /// A fresh run whose transcript holds only the task turn.
    pub fn new(task: Task) -> Self {
        Self::continuing(task, Transcript::new())
    }

    /// A fresh run that follows on from an earlier conversation: the
    /// task turn is appended after `history`.
    pub fn continuing(task: Task, history: Transcript) -> Self {
        let mut transcript = history;
        transcript.push(Turn::user(task.description()));
        Self {
            run_id: Uuid::new_v4().to_string(),
            task,
            transcript,
            attempt_count: 0,
            last_verdict: None,
            status: RunStatus::Running,
        }
    }

    /// Feedback from the most recent "not satisfied" verdict, if any.
    pub fn pending_feedback(&self) -> Option<&str> {
        self.last_verdict
            .as_ref()
            .filter(|v| v.is_retry())
            .map(|v| v.feedback.as_str())
    }
}
