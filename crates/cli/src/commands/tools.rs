//! `sidekick tools` — List the tools the worker can call.

use sidekick_config::AppConfig;
use sidekick_core::{Error, Result};


pub async fn run() -> Result<()> {
    let config = AppConfig::load().map_err(|e| Error::config(e.to_string()))?;
    let registry = sidekick_tools::default_registry(&config.tools, &config.notify);

    println!("🔧 Available Tools");
    println!("==================");
    println!();
    for descriptor in registry.list_descriptors() {
        println!("  {}", descriptor.name);
        println!("      {}", descriptor.description);
        let required = descriptor.parameters["required"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if !required.is_empty() {
            println!("      required: {required}");
        }
    }
    println!();
    println!("  Sandbox:   {}", config.tools.sandbox_dir);
    println!(
        "  Search:    {}",
        if config.tools.serper_api_key.is_some() { "configured" } else { "SERPER_API_KEY not set" }
    );
    println!(
        "  Pushover:  {}",
        if config.notify.is_configured() { "configured" } else { "PUSHOVER_TOKEN / PUSHOVER_USER not set" }
    );

    Ok(())
}
