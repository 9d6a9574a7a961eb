//! Web fetch tool: retrieve the body of a URL.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};

/// Ceiling on returned body text before truncation, in characters.
const MAX_BODY_LEN: usize = 50_000;

pub struct WebFetchTool {
    client: reqwest::Client,
    max_body_len: usize,
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_body_len: MAX_BODY_LEN,
        }
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch the contents of a URL and return the response body as text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The URL to fetch" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(ToolResult::error(
                "Error: URL must start with http:// or https://",
            ));
        }

        debug!(url = %url, "Fetching URL");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::error(format!("Error: Fetch failed: {e}"))),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Error: Could not read response body: {e}"
                )));
            }
        };

        if !status.is_success() {
            return Ok(ToolResult::error(format!(
                "Error: Request returned status {}",
                status.as_u16()
            )));
        }

        let mut text = body;
        if text.len() > self.max_body_len {
            // Avoid splitting a multi-byte character at the cut point.
            let mut cut = self.max_body_len;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            let overflow = text[cut..].chars().count();
            text.truncate(cut);
            text.push_str(&format!("\n... (truncated, {overflow} more chars)"));
        }

        Ok(ToolResult::ok(text))
    }
}
