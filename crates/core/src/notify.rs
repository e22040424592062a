//! Notifier trait — told once when a run succeeds.

use async_trait::async_trait;

use crate::error::NotifyError;

/// Best-effort delivery of a completion message (push notification, chat
/// message, ...). Callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// A notifier that drops every message.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
