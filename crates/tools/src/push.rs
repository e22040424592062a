//! Pushover delivery: the `send_push_notification` tool and the
//! completion [`Notifier`].

use async_trait::async_trait;
use sidekick_config::NotifyConfig;
use sidekick_core::error::{NotifyError, ToolError};
use sidekick_core::notify::Notifier;
use sidekick_core::tool::{Tool, ToolResult};
use tracing::{debug, warn};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// Credentials plus the HTTP call shared by the tool and the notifier.
#[derive(Clone)]
pub struct PushoverClient {
    token: String,
    user: String,
}

impl PushoverClient {
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: user.into(),
        }
    }

    /// Build a client when both credentials are configured.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        match (&config.pushover_token, &config.pushover_user) {
            (Some(token), Some(user)) => Some(Self::new(token, user)),
            _ => None,
        }
    }

    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let client =
            crate::http_client(15).map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        debug!(chars = message.len(), "Sending Pushover message");

        let response = client
            .post(PUSHOVER_URL)
            .form(&[
                ("token", self.token.as_str()),
                ("user", self.user.as_str()),
                ("message", message),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::DeliveryFailed(format!("Pushover returned {status}: {body}")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PushoverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverClient")
            .field("token", &"***")
            .field("user", &"***")
            .finish()
    }
}

/// Tool the worker can call to push a message to the user's phone.
pub struct PushNotificationTool {
    client: Option<PushoverClient>,
}

impl PushNotificationTool {
    pub fn new(client: Option<PushoverClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for PushNotificationTool {
    fn name(&self) -> &str {
        "send_push_notification"
    }

    fn description(&self) -> &str {
        "Send a push notification to the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The message to send"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        let Some(client) = &self.client else {
            return Ok(ToolResult::failure(
                "Push notifications are not configured (PUSHOVER_TOKEN / PUSHOVER_USER).",
            ));
        };

        client
            .send(text)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;
        Ok(ToolResult::ok("success"))
    }
}

/// Completion notifier delivering through Pushover.
#[derive(Debug)]
pub struct PushoverNotifier {
    client: PushoverClient,
}

impl PushoverNotifier {
    pub fn new(client: PushoverClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.client.send(message).await.inspect_err(|e| {
            warn!(error = %e, "Pushover notification failed");
        })
    }
}

/// The notifier for a configuration: Pushover when credentials exist.
pub fn notifier_from_config(config: &NotifyConfig) -> Option<PushoverNotifier> {
    PushoverClient::from_config(config).map(PushoverNotifier::new)
}
