//! The agent reasoning loop implementation.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use hivebot_core::message::{Conversation, Message, MessageToolCall, Role};
use hivebot_core::provider::{ChatRequest, Provider};
use hivebot_core::tool::{ToolCall, ToolRegistry};

/// Text returned when the iteration cap is exhausted without a final
/// response. Not an error: the conversation can continue from here.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: u32,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// System prompt inserted at the head of every conversation
    system_prompt: String,

    /// Maximum tool call iterations per turn
    max_iterations: u32,

    /// Cooperative shutdown flag, checked between iterations
    shutdown: watch::Receiver<bool>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            tools,
            system_prompt: system_prompt.into(),
            max_iterations: 25,
            shutdown,
        }
    }

    /// Set the maximum number of tool call iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Process a conversation turn and generate a response.
    ///
    /// This is the main entry point for the agent loop. It:
    /// 1. Ensures the system prompt heads the conversation
    /// 2. Calls the LLM
    /// 3. If tool calls are returned, executes them in order and loops
    /// 4. Returns the final text response
    ///
    /// Returns `None` only when the shutdown flag was raised mid-turn, in
    /// which case no response should be delivered.
    pub async fn process(&self, conversation: &mut Conversation) -> Option<String> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            "Processing conversation"
        );

        // Ensure the system prompt is the first message
        if conversation.messages.is_empty() || conversation.messages[0].role != Role::System {
            conversation
                .messages
                .insert(0, Message::system(&self.system_prompt));
        }

        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            if *self.shutdown.borrow() {
                info!(conversation_id = %conversation.id, "Stopping turn due to shutdown");
                return None;
            }

            debug!(
                conversation_id = %conversation.id,
                iteration,
                "Agent loop iteration"
            );

            let request = ChatRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                tools: tool_definitions.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let response = self.provider.chat(request).await;

            // An error-shaped response ends the turn with its description;
            // the model never gets to retry within the same turn.
            if response.is_error() {
                let content = response
                    .content
                    .unwrap_or_else(|| "Error calling LLM: unknown failure".into());
                warn!(conversation_id = %conversation.id, "Provider returned an error response");
                conversation.push(Message::assistant(&content));
                return Some(content);
            }

            if !response.has_tool_calls() {
                // No tool calls, this is the final text response
                let content = response.content.unwrap_or_default();
                conversation.push(Message::assistant(&content));
                return Some(content);
            }

            debug!(
                tool_count = response.tool_calls.len(),
                "Executing tool calls"
            );

            // Record the assistant message with its tool calls, then execute
            // each call in the order the model listed them.
            let recorded_calls: Vec<MessageToolCall> = response
                .tool_calls
                .iter()
                .map(|tc| MessageToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::to_string(&tc.arguments)
                        .unwrap_or_else(|_| "{}".into()),
                })
                .collect();
            conversation.push(Message::assistant_with_calls(
                response.content.unwrap_or_default(),
                recorded_calls,
            ));

            for tc in &response.tool_calls {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: tc.arguments.clone(),
                };

                let result = self.tools.execute(&call).await;
                debug!(
                    tool = %tc.name,
                    success = result.success,
                    "Tool call finished"
                );
                conversation.push(Message::tool_result(&tc.id, &result.output));
            }

            // Loop back so the model can see the tool results
        }

        warn!(
            conversation_id = %conversation.id,
            max_iterations = self.max_iterations,
            "Max tool iterations reached, forcing text response"
        );
        conversation.push(Message::assistant(MAX_ITERATIONS_MESSAGE));
        Some(MAX_ITERATIONS_MESSAGE.into())
    }
}
