//! `sidekick chat` — Interactive chat, one superstep per message.

use std::io::Write;

use sidekick_agent::{ChatEntry, Sidekick};
use sidekick_core::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_controller, load_config, with_progress};

pub async fn run(criteria: Option<String>) -> Result<()> {
    let config = load_config()?;
    let controller = build_controller(&config).await?;
    let mut events = controller.subscribe();
    let tool_names = controller.registry().names().join(", ");
    let mut sidekick = Sidekick::new(controller);
    let criteria = criteria.unwrap_or_default();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║         Sidekick — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Session:   {}", sidekick.session_id());
    println!("  Worker:    {}", config.worker_model());
    println!("  Evaluator: {}", config.evaluator_model());
    println!("  Tools:     {tool_names}");
    println!();
    println!("  Type your request and press Enter.");
    println!("  Type 'reset' to start a fresh conversation, 'exit' to quit.");
    println!();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<ChatEntry> = Vec::new();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let message = line.trim();
        match message {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                sidekick.reset();
                history.clear();
                println!("  (conversation reset)\n");
                continue;
            }
            _ => {}
        }

        let before = history.len();
        history = with_progress(
            sidekick.run_superstep(message, &criteria, history),
            &mut events,
        )
        .await;

        println!();
        if let Some(feedback) = history.get(before + 2) {
            println!("  {}", feedback.content);
        }
        println!();
    }

    sidekick.cleanup().await;
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
