//! Configuration loading, validation, and management for Sidekick.
//!
//! Loads configuration from `~/.sidekick/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.sidekick/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used when a model section names none
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// The model that attempts the task
    #[serde(default)]
    pub worker: ModelConfig,

    /// The model that judges the worker's output
    #[serde(default)]
    pub evaluator: ModelConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: LoopConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Completion notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}

/// Worker model used when `[worker] model` is unset.
pub const DEFAULT_WORKER_MODEL: &str = "qwen/qwen3-next-80b-a3b-instruct";
/// Evaluator model used when `[evaluator] model` is unset.
pub const DEFAULT_EVALUATOR_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("worker", &self.worker)
            .field("evaluator", &self.evaluator)
            .field("agent", &self.agent)
            .field("providers", &self.providers)
            .field("tools", &self.tools)
            .field("notify", &self.notify)
            .finish()
    }
}

/// Which provider and model a generative role uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name; falls back to `default_provider`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Limits of the agent control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// "Not satisfied" verdicts allowed before the run is aborted
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound for any single tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Run the tool calls of one worker turn concurrently
    #[serde(default = "default_true")]
    pub concurrent_tools: bool,

    /// Retry policy for worker and evaluator calls
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_attempts() -> u32 {
    10
}
fn default_tool_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl LoopConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            tool_timeout_secs: default_tool_timeout_secs(),
            concurrent_tools: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff for generative calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for one generative call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_retry_attempts() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_call_timeout_secs() -> u64 {
    120
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_backoff_ms as f64 * factor) as u64)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory the file tools are confined to
    #[serde(default = "default_sandbox_dir")]
    pub sandbox_dir: String,

    /// Serper API key for `web_search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serper_api_key: Option<String>,

    /// Interpreter used by `python_repl`
    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    /// Characters of page text returned by `fetch_page`
    #[serde(default = "default_fetch_max_chars")]
    pub fetch_max_chars: usize,

    /// Tools to register. Empty = all built-ins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
}

fn default_sandbox_dir() -> String {
    "sandbox".into()
}
fn default_python_bin() -> String {
    "python3".into()
}
fn default_fetch_max_chars() -> usize {
    8000
}

impl ToolsConfig {
    /// Whether the named tool should be registered.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: default_sandbox_dir(),
            serper_api_key: None,
            python_bin: default_python_bin(),
            fetch_max_chars: default_fetch_max_chars(),
            enabled: vec![],
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("sandbox_dir", &self.sandbox_dir)
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("python_bin", &self.python_bin)
            .field("fetch_max_chars", &self.fetch_max_chars)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Pushover credentials for the completion notification and the
/// `send_push_notification` tool.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushover_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushover_user: Option<String>,
}

impl NotifyConfig {
    pub fn is_configured(&self) -> bool {
        self.pushover_token.is_some() && self.pushover_user.is_some()
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("pushover_token", &redact(&self.pushover_token))
            .field("pushover_user", &redact(&self.pushover_user))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sidekick/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SIDEKICK_API_KEY`, then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY`
    /// - `SIDEKICK_PROVIDER`, `SIDEKICK_WORKER_MODEL`, `SIDEKICK_EVALUATOR_MODEL`
    /// - `SERPER_API_KEY`, `PUSHOVER_TOKEN`, `PUSHOVER_USER`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("SIDEKICK_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("SIDEKICK_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("SIDEKICK_WORKER_MODEL") {
            self.worker.model = Some(model);
        }
        if let Some(model) = lookup("SIDEKICK_EVALUATOR_MODEL") {
            self.evaluator.model = Some(model);
        }
        if self.tools.serper_api_key.is_none() {
            self.tools.serper_api_key = lookup("SERPER_API_KEY");
        }
        if self.notify.pushover_token.is_none() {
            self.notify.pushover_token = lookup("PUSHOVER_TOKEN");
        }
        if self.notify.pushover_user.is_none() {
            self.notify.pushover_user = lookup("PUSHOVER_USER");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sidekick")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (role, model) in [("worker", &self.worker), ("evaluator", &self.evaluator)] {
            if let Some(t) = model.temperature
                && !(0.0..=2.0).contains(&t)
            {
                return Err(ConfigError::ValidationError(format!(
                    "{role}.temperature must be between 0.0 and 2.0"
                )));
            }
        }

        if self.agent.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_attempts must be at least 1".into(),
            ));
        }

        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be > 0".into(),
            ));
        }

        if self.agent.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.agent.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "agent.retry.backoff_multiplier must be >= 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Provider name the worker uses.
    pub fn worker_provider(&self) -> &str {
        self.worker.provider.as_deref().unwrap_or(&self.default_provider)
    }

    /// Provider name the evaluator uses.
    pub fn evaluator_provider(&self) -> &str {
        self.evaluator.provider.as_deref().unwrap_or(&self.default_provider)
    }

    pub fn worker_model(&self) -> &str {
        self.worker.model.as_deref().unwrap_or(DEFAULT_WORKER_MODEL)
    }

    pub fn evaluator_model(&self) -> &str {
        self.evaluator.model.as_deref().unwrap_or(DEFAULT_EVALUATOR_MODEL)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            worker: ModelConfig {
                temperature: Some(0.7),
                ..ModelConfig::default()
            },
            evaluator: ModelConfig {
                temperature: Some(0.0),
                ..ModelConfig::default()
            },
            agent: LoopConfig::default(),
            providers: HashMap::new(),
            tools: ToolsConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
