//! Chat-style session facade over the controller.
//!
//! A [`Sidekick`] turns each chat message into one "superstep": start a run
//! (or resume the one waiting for clarification) and append the user
//! message, the worker's reply and the evaluator's feedback to the chat
//! history. The session keeps the accumulated transcript so each new run
//! sees the conversation that came before it.

use serde::{Deserialize, Serialize};
use sidekick_core::run::{RunState, RunStatus};
use sidekick_core::task::Task;
use sidekick_core::turn::Transcript;
use tracing::{info, warn};
use uuid::Uuid;

use crate::controller::{AgentController, RunHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the chat history shown to the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

pub struct Sidekick {
    session_id: String,
    controller: AgentController,
    pending: Option<RunHandle>,
    /// Every turn of the session so far, carried into the next run.
    memory: Transcript,
}

impl Sidekick {
    pub fn new(controller: AgentController) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            controller,
            pending: None,
            memory: Transcript::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    /// The conversation the next run will start from.
    pub fn memory(&self) -> &Transcript {
        &self.memory
    }

    /// The question of the run waiting for a reply, if any.
    pub fn pending_question(&self) -> Option<&str> {
        match self.pending.as_ref().map(RunHandle::status) {
            Some(RunStatus::AwaitingClarification { question }) => Some(question),
            _ => None,
        }
    }

    /// Process one chat message and return the extended history.
    ///
    /// When the previous superstep ended with a question, `message` is the
    /// answer and the suspended run continues; otherwise a new run starts
    /// with `message` as the task, seeded with the session's earlier turns.
    pub async fn run_superstep(
        &mut self,
        message: &str,
        success_criteria: &str,
        mut history: Vec<ChatEntry>,
    ) -> Vec<ChatEntry> {
        let handle = match self.pending.take() {
            Some(mut handle) => match self.controller.resume_run(&mut handle, message).await {
                Ok(_) => handle,
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Could not resume run, starting over");
                    self.start(message, success_criteria).await
                }
            },
            None => self.start(message, success_criteria).await,
        };

        let state = handle.state();
        let reply = state
            .transcript
            .last_worker_answer()
            .map(|turn| turn.content.clone())
            .unwrap_or_default();

        history.push(ChatEntry::user(message));
        history.push(ChatEntry::assistant(reply));
        history.push(ChatEntry::assistant(state.status.explanation()));
        self.memory = state.transcript.clone();

        if matches!(state.status, RunStatus::AwaitingClarification { .. }) {
            self.pending = Some(handle);
        }
        history
    }

    async fn start(&self, message: &str, success_criteria: &str) -> RunHandle {
        info!(
            session_id = %self.session_id,
            prior_turns = self.memory.len(),
            "Superstep starting a new run"
        );
        let task = Task::new(message, success_criteria);
        let mut handle = RunHandle::from_state(RunState::continuing(task, self.memory.clone()));
        self.controller.start(&mut handle).await;
        handle
    }

    /// Forget any suspended run and the conversation so far.
    pub fn reset(&mut self) {
        self.pending = None;
        self.memory = Transcript::new();
    }

    /// Release tool resources held by the registry.
    pub async fn cleanup(&mut self) {
        self.pending = None;
        self.memory = Transcript::new();
        self.controller.registry().shutdown().await;
        info!(session_id = %self.session_id, "Session cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ToolDispatcher;
    use crate::evaluator::EvaluatorInvoker;
    use crate::test_helpers::*;
    use crate::worker::WorkerInvoker;
    use sidekick_core::tool::ToolRegistry;
    use std::sync::Arc;

    fn sidekick(worker: SequentialMockProvider, evaluator: SequentialMockProvider) -> Sidekick {
        Sidekick::new(AgentController::new(
            WorkerInvoker::new(Arc::new(worker), "w"),
            EvaluatorInvoker::new(Arc::new(evaluator), "e"),
            ToolDispatcher::new(Arc::new(ToolRegistry::new())),
        ))
    }

    #[tokio::test]
    async fn superstep_appends_three_entries() {
        let mut sidekick = sidekick(
            SequentialMockProvider::single_text("4"),
            SequentialMockProvider::new(vec![make_verdict_response(true, false, "correct")]),
        );

        let history = vec![ChatEntry::user("hi"), ChatEntry::assistant("hello")];
        let history = sidekick
            .run_superstep("What is 2+2?", "answer must equal 4", history)
            .await;

        assert_eq!(history.len(), 5);
        assert_eq!(history[2], ChatEntry::user("What is 2+2?"));
        assert_eq!(history[3], ChatEntry::assistant("4"));
        assert_eq!(history[4].content, "Success criteria met: correct");
        assert!(sidekick.pending_question().is_none());
    }

    #[tokio::test]
    async fn clarification_is_answered_by_next_message() {
        let mut sidekick = sidekick(
            SequentialMockProvider::new(vec![
                make_text_response("Which city?"),
                make_text_response("Sunny in Oslo."),
            ]),
            SequentialMockProvider::new(vec![
                make_verdict_response(false, true, "Which city do you mean?"),
                make_verdict_response(true, false, "answered"),
            ]),
        );

        let history = sidekick
            .run_superstep("What's the weather?", "", Vec::new())
            .await;
        assert_eq!(sidekick.pending_question(), Some("Which city do you mean?"));
        assert_eq!(history[2].content, "Clarification needed: Which city do you mean?");

        let history = sidekick.run_superstep("Oslo", "", history).await;
        assert_eq!(history.len(), 6);
        assert_eq!(history[4], ChatEntry::assistant("Sunny in Oslo."));
        assert!(sidekick.pending_question().is_none());
    }

    #[tokio::test]
    async fn follow_up_run_sees_earlier_turns() {
        let worker = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("4"),
            make_text_response("12"),
        ]));
        let evaluator = Arc::new(SequentialMockProvider::new(vec![
            make_verdict_response(true, false, "correct"),
            make_verdict_response(true, false, "correct"),
        ]));
        let mut sidekick = Sidekick::new(AgentController::new(
            WorkerInvoker::new(worker.clone(), "w"),
            EvaluatorInvoker::new(evaluator.clone(), "e"),
            ToolDispatcher::new(Arc::new(ToolRegistry::new())),
        ));

        let history = sidekick.run_superstep("What is 2+2?", "", Vec::new()).await;
        let history = sidekick.run_superstep("Multiply that by 3", "", history).await;
        assert_eq!(history[4], ChatEntry::assistant("12"));

        let second = &worker.requests()[1];
        let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
        let earlier = contents.iter().position(|c| *c == "What is 2+2?").unwrap();
        let answer = contents.iter().position(|c| *c == "4").unwrap();
        let follow_up = contents.iter().position(|c| *c == "Multiply that by 3").unwrap();
        assert!(earlier < answer && answer < follow_up);

        assert!(evaluator.requests()[1].messages[1].content.contains("What is 2+2?"));
    }

    #[tokio::test]
    async fn reset_forgets_the_conversation() {
        let worker = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("4"),
            make_text_response("hello"),
        ]));
        let mut sidekick = Sidekick::new(AgentController::new(
            WorkerInvoker::new(worker.clone(), "w"),
            EvaluatorInvoker::new(
                Arc::new(SequentialMockProvider::repeating(make_verdict_response(true, false, "ok"))),
                "e",
            ),
            ToolDispatcher::new(Arc::new(ToolRegistry::new())),
        ));

        sidekick.run_superstep("What is 2+2?", "", Vec::new()).await;
        assert!(!sidekick.memory().is_empty());
        sidekick.reset();
        assert!(sidekick.memory().is_empty());

        sidekick.run_superstep("Say hello", "", Vec::new()).await;
        let second = &worker.requests()[1];
        assert!(second.messages.iter().all(|m| m.content != "What is 2+2?"));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = sidekick(
            SequentialMockProvider::new(vec![]),
            SequentialMockProvider::new(vec![]),
        );
        let b = sidekick(
            SequentialMockProvider::new(vec![]),
            SequentialMockProvider::new(vec![]),
        );
        assert_ne!(a.session_id(), b.session_id());
        assert!(Uuid::parse_str(a.session_id()).is_ok());
    }

    #[tokio::test]
    async fn cleanup_clears_pending_run() {
        let mut sidekick = sidekick(
            SequentialMockProvider::single_text("?"),
            SequentialMockProvider::new(vec![make_verdict_response(false, true, "Which?")]),
        );
        sidekick.run_superstep("Do it", "", Vec::new()).await;
        assert!(sidekick.pending_question().is_some());

        sidekick.cleanup().await;
        assert!(sidekick.pending_question().is_none());
        assert!(sidekick.memory().is_empty());
    }
}
