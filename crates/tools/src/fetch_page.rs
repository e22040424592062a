//! Page fetching tool: GET a URL and return readable text.
//!
//! Stands in for browser navigation. HTML is rendered to plain text,
//! JSON is pretty-printed, and the result is capped at a character budget.

use async_trait::async_trait;
use serde_json::Value;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolResult};
use tracing::debug;

pub struct FetchPageTool {
    max_chars: usize,
}

impl FetchPageTool {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Open a web page and return its text content. HTML is converted to plain text; \
         long pages are truncated."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http(s) URL to open"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        debug!(url = %url, "fetch_page tool");

        let client = crate::http_client(30).map_err(|e| self.failed(e))?;
        let response = client.get(url).send().await.map_err(|e| self.failed(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let body = response.text().await.map_err(|e| self.failed(e))?;

        let text = render(&content_type, body);
        let output = truncate(&text, self.max_chars);

        if status.is_success() {
            Ok(ToolResult::ok(output))
        } else {
            Ok(ToolResult::failure(format!("[HTTP {status}]\n{output}")))
        }
    }
}

impl FetchPageTool {
    fn failed(&self, e: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        }
    }
}

fn render(content_type: &str, body: String) -> String {
    if content_type.contains("html") {
        html2text::from_read(body.as_bytes(), 100)
    } else if content_type.contains("json") {
        match serde_json::from_str::<Value>(&body) {
            Ok(v) => serde_json::to_string_pretty(&v).unwrap_or(body),
            Err(_) => body,
        }
    } else {
        body
    }
}

/// Cap `text` at `max_chars` characters, on a char boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}...[truncated at {max_chars} chars; total {total} chars]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_rendered_as_text() {
        let html = "<html><body><h1>Hello</h1><p>World</p></body></html>".to_string();
        let text = render("text/html; charset=utf-8", html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("<h1>"));
    }

    #[test]
    fn json_is_pretty_printed() {
        let text = render("application/json", r#"{"a":1}"#.to_string());
        assert!(text.contains("\"a\": 1"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld";
        let out = truncate(text, 4);
        assert!(out.starts_with("héll..."));
        assert!(out.contains("total 11 chars"));
        assert_eq!(truncate("short", 10), "short");
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let tool = FetchPageTool::new(100);
        let result = tool
            .execute(serde_json::json!({"url": "file:///etc/passwd"}))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
