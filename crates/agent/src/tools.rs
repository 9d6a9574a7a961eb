//! Tools that only the main agent loop gets: messaging the user mid-task
//! and spawning background subagents. The runtime registers these on top
//! of the common tool set; the subagent registry deliberately omits them.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use hivebot_core::bus::{MessageBus, OutboundMessage};
use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};

use crate::subagent::{SubagentManager, SubagentOrigin};

/// The chat the runtime is currently serving.
///
/// The runtime updates this before each turn so tools registered once can
/// route to the right place. Turns run sequentially, so the value is stable
/// for the duration of one `process` call.
#[derive(Clone)]
pub struct ReplyContext {
    inner: Arc<Mutex<SubagentOrigin>>,
}

impl ReplyContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubagentOrigin::default())),
        }
    }

    pub fn set(&self, channel: &str, chat_id: &str) {
        let mut origin = self.inner.lock().expect("reply context lock poisoned");
        origin.channel = channel.to_string();
        origin.chat_id = chat_id.to_string();
    }

    pub fn get(&self) -> SubagentOrigin {
        self.inner
            .lock()
            .expect("reply context lock poisoned")
            .clone()
    }
}

impl Default for ReplyContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Send a message to the user before the turn's final response.
pub struct SendMessageTool {
    bus: Arc<MessageBus>,
    context: ReplyContext,
}

impl SendMessageTool {
    pub fn new(bus: Arc<MessageBus>, context: ReplyContext) -> Self {
        Self { bus, context }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to the user immediately, before your final response. Useful for progress updates during long tasks."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The message text to send"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let origin = self.context.get();
        let msg = OutboundMessage {
            channel: origin.channel,
            chat_id: origin.chat_id,
            content: content.to_string(),
        };

        match self.bus.publish_outbound(msg) {
            Ok(()) => Ok(ToolResult::ok("Message sent")),
            Err(e) => Ok(ToolResult::error(format!(
                "Error: Could not send message: {e}"
            ))),
        }
    }
}

/// Spawn a background subagent for an asynchronous task.
pub struct SpawnSubagentTool {
    manager: Arc<SubagentManager>,
    context: ReplyContext,
}

impl SpawnSubagentTool {
    pub fn new(manager: Arc<SubagentManager>, context: ReplyContext) -> Self {
        Self { manager, context }
    }
}

#[async_trait]
impl Tool for SpawnSubagentTool {
    fn name(&self) -> &str {
        "spawn_subagent"
    }

    fn description(&self) -> &str {
        "Spawn a background subagent to work on a task asynchronously. You will be notified when it completes, so you can respond to the user right away."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "A complete description of the task for the subagent"
                },
                "label": {
                    "type": "string",
                    "description": "Optional short human-readable label for the task"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let task = arguments["task"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'task' argument".into()))?;
        let label = arguments["label"].as_str();

        let ack = self.manager.spawn(task, label, self.context.get());
        if ack.starts_with("Error") {
            Ok(ToolResult::error(ack))
        } else {
            Ok(ToolResult::ok(ack))
        }
    }
}
