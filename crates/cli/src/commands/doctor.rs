//! `sidekick doctor` — Diagnose config, sandbox and provider reachability.

use std::path::Path;

use sidekick_config::AppConfig;
use sidekick_core::error::ProviderError;
use sidekick_core::Result;

pub async fn run() -> Result<()> {
    println!("🩺 Sidekick Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `sidekick onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            summary(issues + 1);
            return Ok(());
        }
    };

    let local_only = config.worker_provider() == "ollama" && config.evaluator_provider() == "ollama";
    if config.has_api_key() || local_only {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set OPENROUTER_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    if Path::new(&config.tools.sandbox_dir).is_dir() {
        println!("  ✅ Sandbox directory exists: {}", config.tools.sandbox_dir);
    } else {
        println!("  ⚠️  No sandbox directory at {} — run `sidekick onboard`", config.tools.sandbox_dir);
        issues += 1;
    }

    let router = sidekick_providers::build_from_config(&config);
    let roles = [
        ("worker", config.worker_provider(), config.worker_model()),
        ("evaluator", config.evaluator_provider(), config.evaluator_model()),
    ];
    for (role, name, model) in roles {
        let health = match router.require(name) {
            Ok(provider) => provider.health_check().await,
            Err(e) => Err(e),
        };
        let (line, healthy) = health_line(role, name, model, &health);
        println!("{line}");
        if !healthy {
            issues += 1;
        }
    }

    summary(issues);
    Ok(())
}

/// Render one provider check; the flag is false when it counts as an issue.
fn health_line(
    role: &str,
    provider: &str,
    model: &str,
    health: &std::result::Result<(), ProviderError>,
) -> (String, bool) {
    match health {
        Ok(()) => (format!("  ✅ {role} provider '{provider}' reachable ({model})"), true),
        Err(e) => (format!("  ❌ {role} provider '{provider}' unhealthy: {e}"), false),
    }
}

fn summary(issues: usize) {
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_provider_is_not_an_issue() {
        let (line, healthy) = health_line("worker", "openrouter", "gpt-4o-mini", &Ok(()));
        assert!(healthy);
        assert!(line.contains("worker provider 'openrouter' reachable (gpt-4o-mini)"));
    }

    #[test]
    fn rejected_key_is_reported_as_an_issue() {
        let health = Err(ProviderError::AuthenticationFailed("Invalid API key".into()));
        let (line, healthy) = health_line("evaluator", "openai", "gpt-4o", &health);
        assert!(!healthy);
        assert!(line.contains("evaluator provider 'openai' unhealthy"));
        assert!(line.contains("Invalid API key"));
    }
}
