//! The agent loop controller.
//!
//! Drives one run through worker → tools → worker → … → evaluator cycles
//! until the evaluator is satisfied, asks the human a question, or the run
//! must be aborted:
//!
//! ```text
//! RUNNING ──criteria met──────────▶ DONE
//!    │ ──needs clarification──────▶ AWAITING_CLARIFICATION ──reply──▶ RUNNING
//!    │ ──not satisfied────────────▶ RUNNING (attempt_count + 1)
//!    └──attempt limit / failure──▶ ABORTED
//! ```
//!
//! The controller owns the transcript through [`RunHandle`]; the invokers
//! only ever see `&Transcript` and hand back new turns.

use std::sync::Arc;

use chrono::Utc;
use sidekick_config::AppConfig;
use sidekick_core::error::AgentError;
use sidekick_core::event::{EventBus, RunEvent};
use sidekick_core::notify::Notifier;
use sidekick_core::provider::Provider;
use sidekick_core::run::{RunState, RunStatus};
use sidekick_core::task::Task;
use sidekick_core::tool::ToolRegistry;
use sidekick_core::turn::Turn;
use sidekick_core::verdict::Verdict;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::ToolDispatcher;
use crate::evaluator::EvaluatorInvoker;
use crate::worker::{WorkerInvoker, WorkerOutput};

/// Default bound on "not satisfied" verdicts per run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// A run in progress or at rest: its state plus a cancellation token.
#[derive(Debug)]
pub struct RunHandle {
    state: RunState,
    cancel: CancellationToken,
}

impl RunHandle {
    pub fn new(task: Task) -> Self {
        Self::from_state(RunState::new(task))
    }

    /// Rebuild a handle around a previously saved state.
    pub fn from_state(state: RunState) -> Self {
        Self {
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    pub fn run_id(&self) -> &str {
        &self.state.run_id
    }

    pub fn status(&self) -> &RunStatus {
        &self.state.status
    }

    /// Token that stops the run at the next phase boundary when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

pub struct AgentController {
    worker: WorkerInvoker,
    evaluator: EvaluatorInvoker,
    dispatcher: ToolDispatcher,
    notifier: Option<Arc<dyn Notifier>>,
    events: Arc<EventBus>,
    max_attempts: u32,
}

impl AgentController {
    pub fn new(worker: WorkerInvoker, evaluator: EvaluatorInvoker, dispatcher: ToolDispatcher) -> Self {
        Self {
            worker,
            evaluator,
            dispatcher,
            notifier: None,
            events: Arc::new(EventBus::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Wire a controller from configuration and already-built collaborators.
    pub fn from_config(
        config: &AppConfig,
        worker_provider: Arc<dyn Provider>,
        evaluator_provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let retry = config.agent.retry.clone();

        let worker = WorkerInvoker::new(worker_provider, config.worker_model())
            .with_temperature(config.worker.temperature.unwrap_or(0.7))
            .with_max_tokens(config.worker.max_tokens)
            .with_retry(retry.clone());

        let evaluator = EvaluatorInvoker::new(evaluator_provider, config.evaluator_model())
            .with_temperature(config.evaluator.temperature.unwrap_or(0.0))
            .with_max_tokens(config.evaluator.max_tokens)
            .with_retry(retry);

        let dispatcher = ToolDispatcher::from_config(registry, &config.agent);

        Self::new(worker, evaluator, dispatcher).with_max_attempts(config.agent.max_attempts)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    /// Start a run and drive it until it is done, aborted or waiting for
    /// the human.
    pub async fn start_run(&self, task: Task) -> RunHandle {
        let mut handle = RunHandle::new(task);
        self.start(&mut handle).await;
        handle
    }

    /// Like [`start_run`](Self::start_run) for a handle the caller created,
    /// e.g. to hold on to its cancellation token first.
    pub async fn start(&self, handle: &mut RunHandle) {
        info!(
            run_id = %handle.run_id(),
            max_attempts = self.max_attempts,
            "Starting run"
        );
        if let Some(first) = handle.state.transcript.last().cloned() {
            self.publish_turn(&handle.state.run_id, first);
        }
        self.drive(handle).await;
    }

    /// Append the human's reply to a suspended run and continue it.
    pub async fn resume_run<'a>(
        &self,
        handle: &'a mut RunHandle,
        human_reply: &str,
    ) -> Result<&'a RunState, AgentError> {
        if !matches!(handle.state.status, RunStatus::AwaitingClarification { .. }) {
            return Err(AgentError::NotAwaitingClarification {
                status: handle.state.status.kind().to_string(),
            });
        }

        info!(run_id = %handle.run_id(), "Resuming run with human reply");
        self.append(&mut handle.state, Turn::user(human_reply));
        self.transition(&mut handle.state, RunStatus::Running);
        self.drive(handle).await;
        Ok(&handle.state)
    }

    /// Run evaluation cycles while the run is `Running`.
    pub async fn drive(&self, handle: &mut RunHandle) {
        while handle.state.status == RunStatus::Running {
            if let Err(reason) = self.cycle(handle).await {
                self.abort(&mut handle.state, reason);
            }
        }
    }

    /// One evaluation cycle: worker (with any tool rounds), then evaluator.
    async fn cycle(&self, handle: &mut RunHandle) -> Result<(), AgentError> {
        let descriptors = self.dispatcher.descriptors();
        let state = &mut handle.state;

        loop {
            ensure_active(&handle.cancel)?;

            let output = self
                .worker
                .invoke(&state.transcript, &state.task, &descriptors, state.pending_feedback())
                .await?;

            match output {
                WorkerOutput::Answer(turn) => {
                    self.append(state, turn);
                    break;
                }
                WorkerOutput::ToolCalls { turn, calls } => {
                    self.append(state, turn);
                    ensure_active(&handle.cancel)?;
                    debug!(run_id = %state.run_id, calls = calls.len(), "Dispatching tool calls");
                    for observation in self.dispatcher.dispatch(&calls).await {
                        self.append(state, observation);
                    }
                }
            }
        }

        ensure_active(&handle.cancel)?;
        let verdict = self
            .evaluator
            .evaluate(&state.transcript, state.task.success_criteria())
            .await?;
        state.last_verdict = Some(verdict.clone());

        self.apply_verdict(state, verdict).await
    }

    async fn apply_verdict(&self, state: &mut RunState, verdict: Verdict) -> Result<(), AgentError> {
        if verdict.criteria_met {
            self.append(state, Turn::evaluator(format!("Evaluator feedback: {}", verdict.feedback)));
            self.transition(
                state,
                RunStatus::Done {
                    summary: verdict.feedback,
                },
            );
            self.finish(state);
            self.notify_success(state).await;
            return Ok(());
        }

        if verdict.needs_clarification {
            self.append(state, Turn::evaluator(verdict.feedback.clone()));
            info!(run_id = %state.run_id, question = %verdict.feedback, "Run awaiting clarification");
            self.transition(
                state,
                RunStatus::AwaitingClarification {
                    question: verdict.feedback,
                },
            );
            return Ok(());
        }

        self.append(state, Turn::user(format!("Evaluator feedback: {}", verdict.feedback)));
        state.attempt_count += 1;
        debug!(
            run_id = %state.run_id,
            attempt = state.attempt_count,
            max_attempts = self.max_attempts,
            "Evaluator not satisfied"
        );

        if state.attempt_count >= self.max_attempts {
            return Err(AgentError::AttemptLimitExceeded {
                attempts: state.attempt_count,
                last_feedback: verdict.feedback,
            });
        }
        Ok(())
    }

    fn abort(&self, state: &mut RunState, reason: AgentError) {
        warn!(run_id = %state.run_id, attempts = state.attempt_count, reason = %reason, "Run aborted");
        self.transition(state, RunStatus::Aborted { reason });
        self.finish(state);
    }

    async fn notify_success(&self, state: &RunState) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let message = format!("Sidekick finished: {}", state.task.description());
        if let Err(e) = notifier.notify(&message).await {
            warn!(run_id = %state.run_id, notifier = notifier.name(), error = %e, "Completion notification failed");
        }
    }

    fn append(&self, state: &mut RunState, turn: Turn) {
        state.transcript.push(turn.clone());
        self.publish_turn(&state.run_id, turn);
    }

    fn publish_turn(&self, run_id: &str, turn: Turn) {
        self.events.publish(RunEvent::TurnAppended {
            run_id: run_id.to_string(),
            turn,
        });
    }

    fn transition(&self, state: &mut RunState, to: RunStatus) {
        let from = state.status.kind();
        debug!(run_id = %state.run_id, from, to = to.kind(), "State transition");
        self.events.publish(RunEvent::StateTransition {
            run_id: state.run_id.clone(),
            from: from.to_string(),
            to: to.kind().to_string(),
            timestamp: Utc::now(),
        });
        state.status = to;
    }

    fn finish(&self, state: &RunState) {
        info!(
            run_id = %state.run_id,
            status = %state.status,
            attempts = state.attempt_count,
            turns = state.transcript.len(),
            "Run finished"
        );
        self.events.publish(RunEvent::RunTerminal {
            run_id: state.run_id.clone(),
            status: state.status.clone(),
            attempts: state.attempt_count,
            timestamp: Utc::now(),
        });
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), AgentError> {
    if cancel.is_cancelled() {
        Err(AgentError::Cancelled)
    } else {
        Ok(())
    }
}
