//! Subcommands and the wiring they share.

pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod run;
pub mod tools;

use std::future::Future;
use std::sync::Arc;

use sidekick_agent::AgentController;
use sidekick_config::AppConfig;
use sidekick_core::event::RunEvent;
use sidekick_core::{Error, Result};
use sidekick_core::turn::{Turn, TurnRole};
use tokio::sync::broadcast;

/// Load the config and fail early, with setup hints, when no key is set.
pub(crate) fn load_config() -> Result<AppConfig> {
    let config = AppConfig::load().map_err(|e| Error::config(e.to_string()))?;

    let local_only = config.worker_provider() == "ollama" && config.evaluator_provider() == "ollama";
    if !local_only && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    OPENAI_API_KEY=sk-...             (for OpenAI direct)");
        eprintln!("    SIDEKICK_API_KEY=sk-...           (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err(Error::config("No API key found. See above for setup instructions."));
    }

    Ok(config)
}

/// Build a controller with providers, tools and notifier from `config`.
pub(crate) async fn build_controller(config: &AppConfig) -> Result<AgentController> {
    sidekick_tools::Sandbox::new(&config.tools.sandbox_dir)
        .ensure_root()
        .await?;

    let router = sidekick_providers::build_from_config(config);
    let (worker, evaluator) = sidekick_providers::role_providers(&router, config)?;
    let registry = Arc::new(sidekick_tools::default_registry(&config.tools, &config.notify));
    tracing::debug!(
        worker = config.worker_model(),
        evaluator = config.evaluator_model(),
        tools = registry.len(),
        "Controller wired"
    );

    let mut controller = AgentController::from_config(config, worker, evaluator, registry);
    if let Some(notifier) = sidekick_tools::notifier_from_config(&config.notify) {
        controller = controller.with_notifier(Arc::new(notifier));
    }
    Ok(controller)
}

/// Await `work` while printing run events as they arrive.
pub(crate) async fn with_progress<F: Future>(
    work: F,
    events: &mut broadcast::Receiver<Arc<RunEvent>>,
) -> F::Output {
    tokio::pin!(work);
    let output = loop {
        tokio::select! {
            biased;
            Ok(event) = events.recv() => print_event(&event),
            output = &mut work => break output,
        }
    };
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
    output
}

fn print_event(event: &RunEvent) {
    if let RunEvent::TurnAppended { turn, .. } = event
        && let Some(line) = progress_line(turn)
    {
        println!("{line}");
    }
}

/// One-line rendering of a turn, or `None` for turns the human typed.
fn progress_line(turn: &Turn) -> Option<String> {
    match turn.role {
        TurnRole::User if turn.content.starts_with("Evaluator feedback:") => {
            Some(format!("  ↻ {}", turn.content))
        }
        TurnRole::User => None,
        TurnRole::Worker if turn.requests_tools() => {
            let names: Vec<&str> = turn.tool_calls.iter().map(|c| c.tool_name.as_str()).collect();
            Some(format!("  → calling {}", names.join(", ")))
        }
        TurnRole::Worker => Some(format!("  Worker > {}", turn.content)),
        TurnRole::Tool => {
            let name = turn.tool_name.as_deref().unwrap_or("tool");
            let first = turn.content.lines().next().unwrap_or_default();
            Some(format!("  ← {name}: {}", clip(first, 120)))
        }
        TurnRole::Evaluator => Some(format!("  Evaluator > {}", turn.content)),
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
