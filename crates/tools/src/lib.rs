//! Built-in tool implementations for Sidekick.
//!
//! Tools give the worker the ability to act on the world: open web pages,
//! search, look things up on Wikipedia, run Python, manage files in a
//! sandbox directory and send push notifications.

pub mod fetch_page;
pub mod files;
pub mod push;
pub mod python_repl;
pub mod sandbox;
pub mod web_search;
pub mod wikipedia;

use std::time::Duration;

use sidekick_config::{NotifyConfig, ToolsConfig};
use sidekick_core::tool::ToolRegistry;
use tracing::debug;

pub use push::{PushNotificationTool, PushoverClient, PushoverNotifier, notifier_from_config};
pub use sandbox::{Sandbox, SandboxError};

/// Shared HTTP client settings for the network tools.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(concat!("sidekick/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Create a registry with every built-in tool enabled by `tools`.
///
/// Registration order is stable: browsing, search, knowledge, code, files,
/// notifications.
pub fn default_registry(tools: &ToolsConfig, notify: &NotifyConfig) -> ToolRegistry {
    let sandbox = Sandbox::new(&tools.sandbox_dir);
    let mut registry = ToolRegistry::new();

    let candidates: Vec<Box<dyn sidekick_core::Tool>> = vec![
        Box::new(fetch_page::FetchPageTool::new(tools.fetch_max_chars)),
        Box::new(web_search::WebSearchTool::new(tools.serper_api_key.clone())),
        Box::new(wikipedia::WikipediaTool),
        Box::new(
            python_repl::PythonReplTool::new(&tools.python_bin)
                .with_working_dir(sandbox.root()),
        ),
        Box::new(files::ReadFileTool::new(sandbox.clone())),
        Box::new(files::WriteFileTool::new(sandbox.clone())),
        Box::new(files::ListDirectoryTool::new(sandbox)),
        Box::new(PushNotificationTool::new(PushoverClient::from_config(notify))),
    ];

    for tool in candidates {
        if tools.is_enabled(tool.name()) {
            registry.register(tool);
        } else {
            debug!(tool = tool.name(), "Tool disabled by configuration");
        }
    }
    registry
}
