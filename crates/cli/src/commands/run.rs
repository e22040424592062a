//! `sidekick run` — Work on one task until it is done or aborted.

use std::io::Write;

use sidekick_agent::RunHandle;
use sidekick_core::run::RunStatus;
use sidekick_core::task::Task;
use sidekick_core::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_controller, load_config, with_progress};

pub async fn run(task: String, criteria: Option<String>) -> Result<()> {
    let config = load_config()?;
    let controller = build_controller(&config).await?;
    let mut events = controller.subscribe();

    let task = Task::new(task, criteria.unwrap_or_default());
    println!();
    println!("  Task:      {}", task.description());
    println!("  Criteria:  {}", task.success_criteria());
    println!("  Worker:    {} ({})", config.worker_model(), config.worker_provider());
    println!("  Evaluator: {} ({})", config.evaluator_model(), config.evaluator_provider());
    println!();

    let mut handle = RunHandle::new(task);
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  Cancelling after the current step...");
            cancel.cancel();
        }
    });

    with_progress(controller.start(&mut handle), &mut events).await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let RunStatus::AwaitingClarification { question } = handle.status() {
        println!();
        println!("  ? {question}");
        print!("  You > ");
        std::io::stdout().flush()?;

        let reply = match stdin.next_line().await? {
            Some(line) if !line.trim().is_empty() => line,
            _ => {
                println!();
                println!("  No reply given; the run stays awaiting clarification.");
                return Ok(());
            }
        };
        with_progress(controller.resume_run(&mut handle, reply.trim()), &mut events).await?;
    }

    println!();
    println!("  {}", handle.status().explanation());
    println!("  Attempts: {}", handle.state().attempt_count);
    println!();

    controller.registry().shutdown().await;

    match handle.status() {
        RunStatus::Aborted { reason } => Err(reason.clone().into()),
        _ => Ok(()),
    }
}
