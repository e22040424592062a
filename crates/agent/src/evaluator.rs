//! Evaluator invoker: judges the worker's latest answer against the
//! success criteria.
//!
//! The evaluator has no tools and never touches the transcript. Its reply
//! must be a JSON object; anything else becomes a "retry" verdict carrying
//! the raw text so the worker still gets feedback.

use std::sync::Arc;

use serde::Deserialize;
use sidekick_config::RetryConfig;
use sidekick_core::error::AgentError;
use sidekick_core::message::Message;
use sidekick_core::provider::{Provider, ProviderRequest, ResponseFormat};
use sidekick_core::turn::Transcript;
use sidekick_core::verdict::Verdict;
use tracing::{debug, warn};

use crate::prompts;
use crate::retry::complete_with_retry;

pub struct EvaluatorInvoker {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    retry: RetryConfig,
}

impl EvaluatorInvoker {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, transcript: &Transcript, success_criteria: &str) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(prompts::evaluator_system_prompt()),
                Message::user(prompts::evaluator_user_prompt(transcript, success_criteria)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
            response_format: ResponseFormat::JsonObject,
        }
    }

    /// Produce a fresh verdict for the transcript as it stands.
    pub async fn evaluate(
        &self,
        transcript: &Transcript,
        success_criteria: &str,
    ) -> Result<Verdict, AgentError> {
        let request = self.build_request(transcript, success_criteria);

        let response = complete_with_retry(&self.provider, &request, &self.retry, "evaluator")
            .await
            .map_err(|exhausted| AgentError::EvaluatorUnavailable {
                attempts: exhausted.attempts,
                cause: exhausted.error.to_string(),
            })?;

        let verdict = parse_verdict(&response.message.content).unwrap_or_else(|e| {
            warn!(error = %e, "Evaluator output was not a verdict, treating as retry");
            Verdict::retry(response.message.content.trim())
        });

        debug!(
            criteria_met = verdict.criteria_met,
            needs_clarification = verdict.needs_clarification,
            "Evaluator verdict"
        );
        Ok(verdict)
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default)]
    feedback: Option<String>,
    #[serde(alias = "criteria_met")]
    success_criteria_met: Option<bool>,
    #[serde(alias = "needs_clarification")]
    user_input_needed: Option<bool>,
}

/// Parse the evaluator's JSON reply.
///
/// Markdown code fences and prose around the object are tolerated. Both
/// flags must be present; when both are true the verdict is a retry.
pub fn parse_verdict(raw: &str) -> Result<Verdict, AgentError> {
    let malformed = || AgentError::MalformedEvaluatorOutput {
        raw: raw.trim().to_string(),
    };

    let json = extract_object(raw).ok_or_else(malformed)?;
    let parsed: RawVerdict = serde_json::from_str(json).map_err(|_| malformed())?;

    let (Some(met), Some(clarify)) = (parsed.success_criteria_met, parsed.user_input_needed) else {
        return Err(malformed());
    };
    let feedback = single_line(parsed.feedback.as_deref().unwrap_or_default());

    Ok(match (met, clarify) {
        (true, false) => Verdict::met(feedback),
        (false, true) => Verdict::clarify(feedback),
        _ => Verdict::retry(feedback),
    })
}

/// The outermost `{ ... }` span of `raw`, if any.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
