//! Provider router: maps configured provider names to live backends.
//!
//! The worker and the evaluator may sit on different providers; both look
//! theirs up here by name.

use std::collections::HashMap;
use std::sync::Arc;

use sidekick_config::AppConfig;
use sidekick_core::error::ProviderError;
use sidekick_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Routes model requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Like [`get`](Self::get), but a missing provider is an error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get(name)
            .ok_or_else(|| ProviderError::NotConfigured(format!("provider '{name}' is not registered")))
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every `[providers.*]` table becomes a provider, and the default, worker
/// and evaluator providers are registered even when not listed explicitly.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    let implicit = [
        config.default_provider.as_str(),
        config.worker_provider(),
        config.evaluator_provider(),
    ];
    let names = config.providers.keys().map(String::as_str).chain(implicit);

    for name in names {
        if router.get(name).is_none() {
            router.register(name, backend_for(config, name));
        }
    }
    router
}

/// The worker's and the evaluator's providers, in that order.
pub fn role_providers(
    router: &ProviderRouter,
    config: &AppConfig,
) -> Result<(Arc<dyn Provider>, Arc<dyn Provider>), ProviderError> {
    Ok((
        router.require(config.worker_provider())?,
        router.require(config.evaluator_provider())?,
    ))
}

/// An OpenAI-compatible backend for `name`; a `[providers.<name>]` table
/// overrides the shared key and the well-known base URL.
fn backend_for(config: &AppConfig, name: &str) -> Arc<dyn Provider> {
    let table = config.providers.get(name);
    let api_key = table
        .and_then(|t| t.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();
    let base_url = table
        .and_then(|t| t.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
