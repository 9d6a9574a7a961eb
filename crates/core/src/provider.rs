//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a response
//! back. The contract is deliberately infallible: provider and network
//! failures are converted to a response whose `content` describes the error
//! and whose `finish_reason` is `"error"`, so one flaky call degrades the
//! conversation gracefully instead of crashing it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Finish reason reported on an error-shaped response.
pub const FINISH_REASON_ERROR: &str = "error";

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4", "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
///
/// `parameters` is a JSON-Schema-style object (`type: "object"`, a
/// `properties` mapping, and a `required` list). This is the wire contract
/// handed to the provider for function calling and must be stable across
/// calls within one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque ID correlating this call to its result
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Parsed arguments
    pub arguments: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated text, if any
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls the model wants executed, in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Why generation stopped ("stop", "tool_calls", "length", "error", ...)
    pub finish_reason: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Build the error-shaped response the Provider contract requires when
    /// a request fails.
    pub fn from_error(description: impl std::fmt::Display) -> Self {
        Self {
            content: Some(format!("Error calling LLM: {description}")),
            tool_calls: Vec::new(),
            finish_reason: FINISH_REASON_ERROR.into(),
            usage: None,
        }
    }

    /// Whether the model requested any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether this response describes a provider failure.
    pub fn is_error(&self) -> bool {
        self.finish_reason == FINISH_REASON_ERROR
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls `chat()`
/// without knowing which provider is being used, and never has to handle a
/// transport error; failures arrive as error-shaped responses.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// The model used when a request doesn't specify one.
    fn default_model(&self) -> &str;

    /// Send a request and get a complete response. Must not fail: convert
    /// every transport or API failure via [`ChatResponse::from_error`].
    async fn chat(&self, request: ChatRequest) -> ChatResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_shape() {
        let resp = ChatResponse::from_error("connection refused");
        assert!(resp.is_error());
        assert!(!resp.has_tool_calls());
        assert!(resp.content.unwrap().contains("connection refused"));
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "exec".into(),
            description: "Execute a shell command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The command to run" }
                },
                "required": ["command"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("exec"));
        assert!(json.contains("command"));
    }

    #[test]
    fn chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model": "gpt-4o", "messages": []}"#,
        )
        .unwrap();
        assert_eq!(req.max_tokens, 4096);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.tools.is_empty());
    }
}
