//! Web search tool backed by the Brave Search API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};

const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const DEFAULT_COUNT: u64 = 5;
const MAX_COUNT: u64 = 10;

pub struct WebSearchTool {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns a list of relevant results with titles, URLs, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
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

        let count = arguments["count"]
            .as_u64()
            .unwrap_or(DEFAULT_COUNT)
            .min(MAX_COUNT);

        let Some(api_key) = &self.api_key else {
            return Ok(ToolResult::error(
                "Error: Web search is not configured (no API key)",
            ));
        };

        debug!(query = %query, count, "Web search request");

        let response = match self
            .client
            .get(BRAVE_SEARCH_URL)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::error(format!("Error: Search failed: {e}"))),
        };

        if !response.status().is_success() {
            return Ok(ToolResult::error(format!(
                "Error: Search API returned status {}",
                response.status().as_u16()
            )));
        }

        let parsed: BraveResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Error: Could not parse search response: {e}"
                )));
            }
        };

        let results = parsed.web.map(|w| w.results).unwrap_or_default();
        if results.is_empty() {
            return Ok(ToolResult::ok("No results found"));
        }

        let lines: Vec<String> = results
            .iter()
            .take(count as usize)
            .enumerate()
            .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.description))
            .collect();

        Ok(ToolResult::ok(lines.join("\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition() {
        let tool = WebSearchTool::new(None);
        assert_eq!(tool.name(), "web_search");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["query"]));
    }

    #[tokio::test]
    async fn missing_api_key_reported_as_text() {
        let tool = WebSearchTool::new(None);
        let result = tool
            .execute(serde_json::json!({ "query": "rust async" }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("not configured"));
    }

    #[tokio::test]
    async fn missing_query_rejected() {
        let tool = WebSearchTool::new(Some("key".into()));
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn response_parsing() {
        let raw = serde_json::json!({
            "web": {
                "results": [
                    {
                        "title": "The Rust Programming Language",
                        "url": "https://doc.rust-lang.org/book/",
                        "description": "Learn Rust."
                    },
                    {
                        "title": "crates.io",
                        "url": "https://crates.io/"
                    }
                ]
            }
        });

        let parsed: BraveResponse = serde_json::from_value(raw).unwrap();
        let results = parsed.web.unwrap().results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Rust Programming Language");
        // Missing description defaults to empty.
        assert_eq!(results[1].description, "");
    }
}
