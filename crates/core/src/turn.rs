//! Turns and the append-only transcript of a run.
//!
//! A [`Transcript`] is owned by exactly one run. Components that read it get
//! `&Transcript` and hand back new [`Turn`]s; only the owner appends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, MessageToolCall};
use crate::tool::{ToolCallRequest, ToolResult};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human, or evaluator feedback phrased as coming from the human
    User,
    /// The generative worker
    Worker,
    /// A tool observation
    Tool,
    /// The generative evaluator
    Evaluator,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnRole::User => "user",
            TurnRole::Worker => "worker",
            TurnRole::Tool => "tool",
            TurnRole::Evaluator => "evaluator",
        };
        f.write_str(name)
    }
}

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,

    pub role: TurnRole,

    pub content: String,

    /// Tool calls requested by a worker turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Name of the tool a tool turn observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// The request id a tool turn answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Structured outcome of a tool turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,

    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
            tool_call_id: None,
            tool_result: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn worker(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Worker, content)
    }

    /// A worker turn that requests tools, with an optional intermediate message.
    pub fn worker_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        let mut turn = Self::new(TurnRole::Worker, content);
        turn.tool_calls = calls;
        turn
    }

    pub fn evaluator(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Evaluator, content)
    }

    /// A tool observation answering `call`.
    pub fn tool(call: &ToolCallRequest, result: ToolResult) -> Self {
        let mut turn = Self::new(TurnRole::Tool, result.output.clone());
        turn.tool_name = Some(call.tool_name.clone());
        turn.tool_call_id = Some(call.id.clone());
        turn.tool_result = Some(result);
        turn
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Render this turn as a provider message.
    ///
    /// Evaluator turns are shown to the worker as assistant output, matching
    /// how the verdict text reads in the conversation.
    pub fn to_message(&self) -> Message {
        match self.role {
            TurnRole::User => Message::user(&self.content),
            TurnRole::Worker => {
                let mut msg = Message::assistant(&self.content);
                msg.tool_calls = self
                    .tool_calls
                    .iter()
                    .map(|call| MessageToolCall {
                        id: call.id.clone(),
                        name: call.tool_name.clone(),
                        arguments: call.arguments.to_string(),
                    })
                    .collect();
                msg
            }
            TurnRole::Tool => Message::tool_result(
                self.tool_call_id.clone().unwrap_or_default(),
                &self.content,
            ),
            TurnRole::Evaluator => Message::assistant(&self.content),
        }
    }
}

/// The ordered, append-only conversation log of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn and return a reference to it.
    pub fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The most recent worker turn that did not request tools.
    pub fn last_worker_answer(&self) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Worker && !t.requests_tools())
    }

    /// Render every turn as a provider message, in order.
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(Turn::to_message).collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            tool_name: name.into(),
            arguments: serde_json::json!({"query": "rust"}),
        }
    }

    #[test]
    fn push_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("task"));
        transcript.push(Turn::worker("answer"));
        transcript.push(Turn::evaluator("ok"));

        let roles: Vec<_> = transcript.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Worker, TurnRole::Evaluator]);
    }

    #[test]
    fn last_worker_answer_skips_tool_requests() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("task"));
        transcript.push(Turn::worker("first draft"));
        transcript.push(Turn::worker_tool_calls("", vec![call("c1", "web_search")]));

        let answer = transcript.last_worker_answer().unwrap();
        assert_eq!(answer.content, "first draft");
    }

    #[test]
    fn tool_turn_renders_as_tool_message() {
        let request = call("c1", "web_search");
        let turn = Turn::tool(&request, ToolResult::ok("3 results"));
        assert_eq!(turn.tool_name.as_deref(), Some("web_search"));

        let msg = turn.to_message();
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.content, "3 results");
    }

    #[test]
    fn worker_tool_calls_render_arguments_as_json() {
        let turn = Turn::worker_tool_calls("let me search", vec![call("c1", "web_search")]);
        let msg = turn.to_message();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        let args: serde_json::Value = serde_json::from_str(&msg.tool_calls[0].arguments).unwrap();
        assert_eq!(args["query"], "rust");
    }

    #[test]
    fn transcript_serialization_roundtrip() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("What is 2+2?"));
        transcript.push(Turn::worker("4"));
        let json = serde_json::to_string(&transcript).unwrap();
        let restored: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, transcript);
    }
}
