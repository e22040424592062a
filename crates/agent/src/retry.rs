//! Bounded retry with exponential backoff for provider calls.

use std::sync::Arc;

use sidekick_config::RetryConfig;
use sidekick_core::error::ProviderError;
use sidekick_core::provider::{Provider, ProviderRequest, ProviderResponse};
use tracing::warn;

/// The last error of an exhausted retry loop and how many attempts it took.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub error: ProviderError,
}

/// Call `provider` until it succeeds, the error is not transient, or the
/// configured attempts run out. Each call is bounded by the configured call timeout.
pub async fn complete_with_retry(
    provider: &Arc<dyn Provider>,
    request: &ProviderRequest,
    policy: &RetryConfig,
    role: &str,
) -> Result<ProviderResponse, RetryExhausted> {
    let mut attempt = 0;
    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(
            policy.call_timeout(),
            provider.complete(request.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{role} call exceeded {}s",
                policy.call_timeout_secs
            ))),
        };

        let error = match outcome {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !error.is_transient() || attempt >= policy.max_attempts.max(1) {
            return Err(RetryExhausted {
                attempts: attempt,
                error,
            });
        }

        let delay = policy.backoff(attempt);
        warn!(
            role,
            provider = provider.name(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Provider call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
