//! OpenAI-compatible provider implementation.
//!
//! Works with any endpoint exposing the `/v1/chat/completions` wire format:
//! OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks AI, and
//! self-hosted proxies.
//!
//! Supports chat completions with tool use / function calling. Streaming
//! is not needed by the agent loop and is not implemented.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use hivebot_core::message::{Message, Role};
use hivebot_core::provider::{
    ChatRequest, ChatResponse, Provider, ToolCallRequest, ToolDefinition, Usage,
};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            client,
        }
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::new(
            "openrouter",
            "https://openrouter.ai/api/v1",
            api_key,
            default_model,
        )
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>, default_model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            default_model,
        )
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                }
                .into(),
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                kind: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    async fn try_chat(&self, request: &ChatRequest) -> Result<ChatResponse, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = if request.model.is_empty() {
            &self.default_model
        } else {
            &request.model
        };

        let mut body = serde_json::json!({
            "model": model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }

        debug!(provider = %self.name, model = %model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("network error: {e}"))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(format!("API error (status {status}): {error_body}"));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "no choices in response".to_string())?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // A malformed arguments payload degrades one call, not the
                // whole turn.
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({ "raw": tc.function.arguments }));
                ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
            usage,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(&self, request: ChatRequest) -> ChatResponse {
        match self.try_chat(&request).await {
            Ok(response) => response,
            Err(description) => {
                warn!(provider = %self.name, error = %description, "Chat request failed");
                ChatResponse::from_error(description)
            }
        }
    }
}

// --- Wire types ---

#[derive(serde::Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(serde::Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunction,
}

#[derive(serde::Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider =
            OpenAiCompatProvider::new("test", "https://api.example.com/v1/", "key", "model-x");
        assert_eq!(provider.base_url, "https://api.example.com/v1");
        assert_eq!(provider.default_model(), "model-x");
    }

    #[test]
    fn api_messages_carry_tool_plumbing() {
        let mut assistant = Message::assistant_with_calls(
            "",
            vec![hivebot_core::message::MessageToolCall {
                id: "call_1".into(),
                name: "read_file".into(),
                arguments: r#"{"path":"a.txt"}"#.into(),
            }],
        );
        assistant.content = String::new();
        let tool = Message::tool_result("call_1", "file contents");

        let api = OpenAiCompatProvider::to_api_messages(&[assistant, tool]);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "assistant");
        assert_eq!(api[0].tool_calls.as_ref().unwrap()[0].function.name, "read_file");
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn api_tools_use_function_wrapper() {
        let defs = vec![ToolDefinition {
            name: "exec".into(),
            description: "run a command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "command": { "type": "string" } },
                "required": ["command"]
            }),
        }];
        let api = OpenAiCompatProvider::to_api_tools(&defs);
        assert_eq!(api[0]["type"], "function");
        assert_eq!(api[0]["function"]["name"], "exec");
        assert_eq!(api[0]["function"]["parameters"]["required"][0], "command");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_error_response() {
        // Port 9 (discard) refuses connections on loopback; the provider
        // must absorb the failure rather than surface it.
        let provider =
            OpenAiCompatProvider::new("test", "http://127.0.0.1:9/v1", "key", "model-x");
        let response = provider
            .chat(ChatRequest {
                model: "model-x".into(),
                messages: vec![Message::user("hello")],
                tools: vec![],
                max_tokens: 16,
                temperature: 0.0,
            })
            .await;

        assert!(response.is_error());
        assert!(response.content.unwrap().starts_with("Error calling LLM:"));
    }

    #[test]
    fn response_parsing_handles_tool_calls() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "list_dir", "arguments": "{\"path\": \"/tmp\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let choice = &parsed.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        let calls = choice.message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "list_dir");
    }
}
