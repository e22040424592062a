//! `sidekick onboard` — First-time setup.

use sidekick_config::AppConfig;
use sidekick_core::Result;


pub async fn run() -> Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🛠  Sidekick — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set OPENROUTER_API_KEY (or add api_key to the config)");
        println!("   2. Optionally set SERPER_API_KEY, PUSHOVER_TOKEN and PUSHOVER_USER");
        println!("   3. Run: sidekick run --task \"...\" --criteria \"...\"\n");
    }

    let sandbox = AppConfig::load_from(&config_path)
        .map(|c| c.tools.sandbox_dir)
        .unwrap_or_else(|_| AppConfig::default().tools.sandbox_dir);
    sidekick_tools::Sandbox::new(&sandbox).ensure_root().await?;
    println!("✅ Sandbox directory ready: {sandbox}");

    println!("\n🎉 Setup complete! Run `sidekick chat` to start.\n");

    Ok(())
}
