//! Web search tool backed by the Serper (Google Search) API.

use async_trait::async_trait;
use serde_json::Value;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolResult};
use tracing::debug;

const SERPER_URL: &str = "https://google.serper.dev/search";

pub struct WebSearchTool {
    api_key: Option<String>,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web with Google. Returns a direct answer when one exists, \
         otherwise the top results with titles, URLs and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5, max 10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let num_results = arguments["num_results"].as_u64().unwrap_or(5).clamp(1, 10) as usize;

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolResult::failure(
                "No Serper API key configured. Set SERPER_API_KEY or tools.serper_api_key.",
            ));
        };

        debug!(query = %query, num_results, "web_search tool");

        let client = crate::http_client(15).map_err(|e| self.failed(e))?;
        let response = client
            .post(SERPER_URL)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query, "num": num_results }))
            .send()
            .await
            .map_err(|e| self.failed(e))?;

        if !response.status().is_success() {
            return Ok(ToolResult::failure(format!(
                "Search API returned status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| self.failed(e))?;
        Ok(ToolResult::ok(format_results(&body, num_results)).with_data(body))
    }
}

impl WebSearchTool {
    fn failed(&self, e: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        }
    }
}

/// Render a Serper response: the answer box first, then organic results.
fn format_results(body: &Value, count: usize) -> String {
    let mut sections = Vec::new();

    if let Some(answer_box) = body.get("answerBox") {
        let answer = answer_box
            .get("answer")
            .or_else(|| answer_box.get("snippet"))
            .and_then(|v| v.as_str());
        if let Some(answer) = answer {
            sections.push(format!("Answer: {answer}"));
        }
    }

    let organic = body
        .get("organic")
        .and_then(|o| o.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[]);

    for (i, r) in organic.iter().take(count).enumerate() {
        let title = r.get("title").and_then(|v| v.as_str()).unwrap_or("(no title)");
        let link = r.get("link").and_then(|v| v.as_str()).unwrap_or("");
        let snippet = r.get("snippet").and_then(|v| v.as_str()).unwrap_or("");
        sections.push(format!("{}. {title}\n   {link}\n   {snippet}", i + 1));
    }

    if sections.is_empty() {
        "(no results)".to_string()
    } else {
        sections.join("\n\n")
    }
}
