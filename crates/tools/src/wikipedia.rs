//! Wikipedia lookup: search for pages and return their introductions.

use async_trait::async_trait;
use serde_json::Value;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolResult};
use tracing::debug;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const MAX_PAGES: u64 = 3;
const MAX_SUMMARY_CHARS: usize = 4000;

pub struct WikipediaTool;

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up a topic on Wikipedia. Returns the title and introduction of the best \
         matching pages. Use for general knowledge about people, places, events and concepts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Topic to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(query = %query, "wikipedia tool");

        let client = crate::http_client(15).map_err(|e| self.failed(e))?;
        let limit = MAX_PAGES.to_string();

        let search: Value = client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.failed(e))?
            .json()
            .await
            .map_err(|e| self.failed(e))?;

        let titles = search_titles(&search);
        if titles.is_empty() {
            return Ok(ToolResult::ok("No good Wikipedia Search Result was found"));
        }

        let joined = titles.join("|");
        let extracts: Value = client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", joined.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.failed(e))?
            .json()
            .await
            .map_err(|e| self.failed(e))?;

        Ok(ToolResult::ok(format_pages(&titles, &extracts)))
    }
}

impl WikipediaTool {
    fn failed(&self, e: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        }
    }
}

fn search_titles(body: &Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|h| h["title"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Render `Page:` / `Summary:` blocks in search-rank order.
fn format_pages(titles: &[String], extracts: &Value) -> String {
    let pages: Vec<&Value> = extracts["query"]["pages"]
        .as_object()
        .map(|p| p.values().collect())
        .unwrap_or_default();

    let blocks: Vec<String> = titles
        .iter()
        .filter_map(|title| {
            let page = pages.iter().find(|p| p["title"].as_str() == Some(title.as_str()))?;
            let extract = page["extract"].as_str()?.trim();
            if extract.is_empty() {
                return None;
            }
            let summary: String = extract.chars().take(MAX_SUMMARY_CHARS).collect();
            Some(format!("Page: {title}\nSummary: {summary}"))
        })
        .collect();

    if blocks.is_empty() {
        "No good Wikipedia Search Result was found".to_string()
    } else {
        blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_in_rank_order() {
        let body = serde_json::json!({
            "query": { "search": [ { "title": "Rust (programming language)" }, { "title": "Rust" } ] }
        });
        assert_eq!(search_titles(&body), vec!["Rust (programming language)", "Rust"]);
        assert!(search_titles(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn pages_follow_search_rank() {
        let titles = vec!["B".to_string(), "A".to_string()];
        let extracts = serde_json::json!({
            "query": { "pages": {
                "1": { "title": "A", "extract": "First letter." },
                "2": { "title": "B", "extract": "Second letter." }
            }}
        });
        let text = format_pages(&titles, &extracts);
        assert_eq!(
            text,
            "Page: B\nSummary: Second letter.\n\nPage: A\nSummary: First letter."
        );
    }

    #[test]
    fn empty_extracts_fall_back() {
        let titles = vec!["A".to_string()];
        let extracts = serde_json::json!({ "query": { "pages": { "1": { "title": "A", "extract": "" } } } });
        assert_eq!(
            format_pages(&titles, &extracts),
            "No good Wikipedia Search Result was found"
        );
    }
}
