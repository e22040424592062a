//! Prompt construction for the worker and the evaluator.
//!
//! Prompts are rebuilt on every call and never stored in the transcript.

use chrono::{DateTime, Local};
use sidekick_core::turn::{Transcript, TurnRole};

/// System prompt for one worker call.
pub fn worker_system_prompt(
    success_criteria: &str,
    feedback: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let mut prompt = format!(
        "You are a helpful assistant that can use tools to complete tasks.\n\
         You should continue working until either:\n\
         - The success criteria is met, OR\n\
         - You need clarification from the user.\n\
         \n\
         Rules:\n\
         - Use tools when needed.\n\
         - If using Python, include print() to return output.\n\
         - If finished, provide a final answer.\n\
         - If clarification is needed, clearly ask a question.\n\
         \n\
         Current date and time: {}\n\
         \n\
         Success criteria:\n\
         {success_criteria}",
        now.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        prompt.push_str(&format!(
            "\n\nPrevious attempt was rejected for the following reason:\n\
             {feedback}\n\
             \n\
             Please correct the issue and continue."
        ));
    }

    prompt
}

/// System prompt for the evaluator: output rules only.
pub fn evaluator_system_prompt() -> String {
    "You are an evaluator.\n\
     \n\
     CRITICAL OUTPUT RULES:\n\
     - Respond ONLY with valid JSON of the form \
     {\"feedback\": string, \"success_criteria_met\": boolean, \"user_input_needed\": boolean}\n\
     - feedback MUST be a single-line string\n\
     - Do NOT use newlines\n\
     - Do NOT use bullet points\n\
     - Do NOT use markdown\n\
     - Do NOT start feedback with whitespace\n\
     - Set at most one of success_criteria_met and user_input_needed to true\n\
     - When user_input_needed is true, feedback is the question for the user"
        .to_string()
}

/// The evaluator's user message for one evaluation cycle.
pub fn evaluator_user_prompt(transcript: &Transcript, success_criteria: &str) -> String {
    let final_response = transcript
        .last_worker_answer()
        .map(|t| t.content.as_str())
        .unwrap_or_default();

    format!(
        "Conversation:\n\
         {}\n\
         \n\
         Success criteria:\n\
         {success_criteria}\n\
         \n\
         Assistant final response:\n\
         {final_response}\n\
         \n\
         Evaluate if the success criteria is met.\n\
         Decide if user input is required.\n\
         \n\
         If the assistant claims to have written files, assume it did so.\n\
         Give benefit of the doubt, but reject if more work is needed.",
        render_conversation(transcript)
    )
}

/// `User:` / `Assistant:` lines; tool observations are left out.
pub fn render_conversation(transcript: &Transcript) -> String {
    let lines: Vec<String> = transcript
        .iter()
        .filter_map(|turn| match turn.role {
            TurnRole::User => Some(format!("User: {}", turn.content)),
            TurnRole::Worker | TurnRole::Evaluator => {
                let content = if turn.content.trim().is_empty() {
                    "[tool use]"
                } else {
                    turn.content.as_str()
                };
                Some(format!("Assistant: {content}"))
            }
            TurnRole::Tool => None,
        })
        .collect();
    lines.join("\n")
}
