//! Run events — what a UI subscribes to in order to follow a run.
//!
//! Events are published as a run progresses. Subscribers can render them
//! progressively without the core knowing anything about rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::run::RunStatus;
use crate::turn::Turn;

/// All observable run events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A turn was appended to a run's transcript
    TurnAppended { run_id: String, turn: Turn },

    /// The run moved between states
    StateTransition {
        run_id: String,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// The run reached `done` or `aborted`
    RunTerminal {
        run_id: String,
        status: RunStatus,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::TurnAppended { run_id, .. }
            | RunEvent::StateTransition { run_id, .. }
            | RunEvent::RunTerminal { run_id, .. } => run_id,
        }
    }
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
