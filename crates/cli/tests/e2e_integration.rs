//! End-to-end integration tests for Sidekick.
//!
//! These tests exercise the full pipeline from a task to a terminal run
//! state: scripted worker and evaluator providers, the real built-in tool
//! registry, the dispatcher, the controller and the chat session facade.

use std::sync::Arc;

use sidekick_agent::test_helpers::{
    RecordingNotifier, SequentialMockProvider, make_text_response, make_tool_call,
    make_tool_call_response, make_verdict_response,
};
use sidekick_agent::{AgentController, ChatEntry, EvaluatorInvoker, Sidekick, ToolDispatcher, WorkerInvoker};
use sidekick_config::{AppConfig, NotifyConfig, ToolsConfig};
use sidekick_core::error::AgentError;
use sidekick_core::event::RunEvent;
use sidekick_core::message::Role;
use sidekick_core::run::RunStatus;
use sidekick_core::task::Task;
use sidekick_core::tool::ToolRegistry;
use sidekick_core::turn::TurnRole;
use sidekick_tools::default_registry;

// ── Wiring ───────────────────────────────────────────────────────────────

fn controller_with(
    worker: &Arc<SequentialMockProvider>,
    evaluator: &Arc<SequentialMockProvider>,
    registry: ToolRegistry,
) -> AgentController {
    AgentController::new(
        WorkerInvoker::new(worker.clone(), "worker-model"),
        EvaluatorInvoker::new(evaluator.clone(), "evaluator-model"),
        ToolDispatcher::new(Arc::new(registry)),
    )
}

fn sandbox_tools(dir: &tempfile::TempDir) -> ToolRegistry {
    let tools = ToolsConfig {
        sandbox_dir: dir.path().to_string_lossy().into_owned(),
        ..ToolsConfig::default()
    };
    default_registry(&tools, &NotifyConfig::default())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_arithmetic_task_succeeds_first_cycle() {
    let worker = Arc::new(SequentialMockProvider::single_text("4"));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true,
        false,
        "The answer 4 is correct.",
    )]));
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = controller_with(&worker, &evaluator, ToolRegistry::new())
        .with_notifier(notifier.clone());

    let handle = controller
        .start_run(Task::new("What is 2+2?", "answer must equal 4"))
        .await;
    let state = handle.state();

    assert!(matches!(state.status, RunStatus::Done { .. }));
    assert_eq!(state.transcript.len(), 3);
    let roles: Vec<TurnRole> = state.transcript.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![TurnRole::User, TurnRole::Worker, TurnRole::Evaluator]);
    assert_eq!(notifier.messages(), vec!["Sidekick finished: What is 2+2?".to_string()]);
}

#[tokio::test]
async fn e2e_never_satisfied_evaluator_aborts_at_bound() {
    let worker = Arc::new(SequentialMockProvider::repeating(make_text_response("maybe 5?")));
    let evaluator = Arc::new(SequentialMockProvider::repeating(make_verdict_response(
        false,
        false,
        "The answer is wrong.",
    )));
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = controller_with(&worker, &evaluator, ToolRegistry::new())
        .with_notifier(notifier.clone())
        .with_max_attempts(3);

    let handle = controller
        .start_run(Task::new("What is 2+2?", "answer must equal 4"))
        .await;

    assert_eq!(
        handle.status(),
        &RunStatus::Aborted {
            reason: AgentError::AttemptLimitExceeded {
                attempts: 3,
                last_feedback: "The answer is wrong.".into()
            }
        }
    );
    assert_eq!(evaluator.call_count(), 3);
    assert!(notifier.messages().is_empty());

    let feedback_turns = handle
        .state()
        .transcript
        .iter()
        .filter(|t| t.role == TurnRole::User && t.content.starts_with("Evaluator feedback:"))
        .count();
    assert_eq!(feedback_turns, 3);
}

#[tokio::test]
async fn e2e_unknown_tool_is_reported_to_worker() {
    let worker = Arc::new(SequentialMockProvider::new(vec![
        make_tool_call_response(
            vec![make_tool_call("teleport", serde_json::json!({"destination": "mars"}))],
            "",
        ),
        make_text_response("I have no teleport tool, so I cannot go to Mars."),
    ]));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true,
        false,
        "Honest about the limitation.",
    )]));
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(&worker, &evaluator, sandbox_tools(&dir));

    let handle = controller
        .start_run(Task::new("Teleport me to Mars", "explain the outcome"))
        .await;
    assert!(matches!(handle.status(), RunStatus::Done { .. }));

    let second_call = &worker.requests()[1];
    let observation = second_call
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool observation sent to the worker");
    assert_eq!(observation.content, "Error: tool 'teleport' is unavailable");
    assert_eq!(observation.tool_call_id.as_deref(), Some("call_teleport"));
}

#[tokio::test]
async fn e2e_worker_sees_all_builtin_tools() {
    let worker = Arc::new(SequentialMockProvider::single_text("done"));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true, false, "ok",
    )]));
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(&worker, &evaluator, sandbox_tools(&dir));

    controller.start_run(Task::new("Say done", "")).await;

    let request = &worker.requests()[0];
    let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "fetch_page",
            "web_search",
            "wikipedia",
            "python_repl",
            "read_file",
            "write_file",
            "list_directory",
            "send_push_notification"
        ]
    );
    assert!(request.messages[0].content.contains("The answer should be clear and accurate"));
}

#[tokio::test]
async fn e2e_sandbox_file_round_trip() {
    let worker = Arc::new(SequentialMockProvider::new(vec![
        make_tool_call_response(
            vec![make_tool_call(
                "write_file",
                serde_json::json!({"path": "notes/plan.md", "content": "# Plan\n- step one"}),
            )],
            "Writing the plan",
        ),
        make_tool_call_response(
            vec![
                make_tool_call("list_directory", serde_json::json!({"path": "notes"})),
                make_tool_call("read_file", serde_json::json!({"path": "notes/plan.md"})),
            ],
            "",
        ),
        make_text_response("The plan is saved in notes/plan.md."),
    ]));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true,
        false,
        "File written.",
    )]));
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(&worker, &evaluator, sandbox_tools(&dir));

    let handle = controller
        .start_run(Task::new("Write a plan to notes/plan.md", "the file exists"))
        .await;
    assert!(matches!(handle.status(), RunStatus::Done { .. }));

    let written = std::fs::read_to_string(dir.path().join("notes/plan.md")).unwrap();
    assert_eq!(written, "# Plan\n- step one");

    let observations: Vec<&str> = handle
        .state()
        .transcript
        .iter()
        .filter(|t| t.role == TurnRole::Tool)
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(observations.len(), 3);
    assert!(observations[0].starts_with("Successfully wrote"));
    assert!(observations[1].contains("plan.md"));
    assert_eq!(observations[2], "# Plan\n- step one");
}

#[tokio::test]
async fn e2e_sandbox_escape_is_an_observation() {
    let worker = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call("read_file", serde_json::json!({"path": "../../etc/passwd"}))],
        "",
        "That file is outside my sandbox.",
    ));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true, false, "ok",
    )]));
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(&worker, &evaluator, sandbox_tools(&dir));

    let handle = controller.start_run(Task::new("Read /etc/passwd", "")).await;
    assert!(matches!(handle.status(), RunStatus::Done { .. }));

    let tool_turn = handle
        .state()
        .transcript
        .iter()
        .find(|t| t.role == TurnRole::Tool)
        .unwrap();
    assert!(tool_turn.content.starts_with("Error: Permission denied"));
    assert!(!tool_turn.tool_result.as_ref().unwrap().success);
}

#[tokio::test]
async fn e2e_clarification_round_trip_through_chat() {
    let worker = Arc::new(SequentialMockProvider::new(vec![
        make_text_response("Which date should the meeting be on?"),
        make_text_response("Meeting booked for Friday."),
    ]));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![
        make_verdict_response(false, true, "Which date do you want?"),
        make_verdict_response(true, false, "Booked."),
    ]));
    let mut sidekick = Sidekick::new(controller_with(&worker, &evaluator, ToolRegistry::new()));

    let history = sidekick
        .run_superstep("Book a meeting", "meeting is booked", Vec::new())
        .await;
    assert_eq!(history.len(), 3);
    assert_eq!(sidekick.pending_question(), Some("Which date do you want?"));

    let history = sidekick.run_superstep("Friday", "meeting is booked", history).await;
    assert_eq!(history.len(), 6);
    assert_eq!(history[3], ChatEntry::user("Friday"));
    assert_eq!(history[4], ChatEntry::assistant("Meeting booked for Friday."));
    assert_eq!(history[5].content, "Success criteria met: Booked.");

    // The resumed run kept the original task and appended the reply once.
    let resumed = &worker.requests()[1];
    let user_turns: Vec<&str> = resumed
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(user_turns, vec!["Book a meeting", "Friday"]);
}

#[tokio::test]
async fn e2e_events_follow_the_transcript() {
    let worker = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call("list_directory", serde_json::json!({}))],
        "",
        "The sandbox is empty.",
    ));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true, false, "ok",
    )]));
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(&worker, &evaluator, sandbox_tools(&dir));
    let mut rx = controller.subscribe();

    let handle = controller.start_run(Task::new("What is in the sandbox?", "")).await;

    let mut appended = Vec::new();
    let mut terminal = 0;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            RunEvent::TurnAppended { turn, .. } => appended.push(turn.id.clone()),
            RunEvent::RunTerminal { .. } => terminal += 1,
            RunEvent::StateTransition { .. } => {}
        }
    }

    let transcript_ids: Vec<String> = handle.state().transcript.iter().map(|t| t.id.clone()).collect();
    assert_eq!(appended, transcript_ids);
    assert_eq!(terminal, 1);
}

#[tokio::test]
async fn e2e_controller_from_default_config() {
    let mut config = AppConfig::default();
    config.worker.max_tokens = Some(1024);
    config.evaluator.max_tokens = Some(200);
    let worker = Arc::new(SequentialMockProvider::single_text("4"));
    let evaluator = Arc::new(SequentialMockProvider::new(vec![make_verdict_response(
        true, false, "ok",
    )]));
    let controller = AgentController::from_config(
        &config,
        worker.clone(),
        evaluator.clone(),
        Arc::new(ToolRegistry::new()),
    );

    let handle = controller.start_run(Task::new("What is 2+2?", "")).await;
    assert!(matches!(handle.status(), RunStatus::Done { .. }));

    assert_eq!(worker.requests()[0].model, config.worker_model());
    assert_eq!(worker.requests()[0].max_tokens, Some(1024));
    let judge = &evaluator.requests()[0];
    assert_eq!(judge.model, config.evaluator_model());
    assert_eq!(judge.temperature, 0.0);
    assert_eq!(judge.max_tokens, Some(200));
}
