//! The runtime dispatcher: wires the bus, the agent loop, and the
//! subagent manager together.
//!
//! Consumes inbound messages one at a time, keeps one conversation per
//! chat stream, and publishes final answers back on the bus. Processing is
//! sequential, which is what preserves ordering within a chat.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use hivebot_config::AppConfig;
use hivebot_core::bus::{InboundMessage, MessageBus, OutboundMessage, SYSTEM_CHANNEL};
use hivebot_core::error::Result;
use hivebot_core::message::{Conversation, Message};
use hivebot_core::provider::Provider;

use crate::loop_runner::AgentLoop;
use crate::subagent::SubagentManager;
use crate::tools::{ReplyContext, SendMessageTool, SpawnSubagentTool};

/// How long `run` waits for subagents to wind down on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Triggers a runtime shutdown from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

pub struct AgentRuntime {
    bus: Arc<MessageBus>,
    agent: AgentLoop,
    manager: Arc<SubagentManager>,
    context: ReplyContext,
    conversations: HashMap<String, Conversation>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl AgentRuntime {
    pub fn new(config: &AppConfig, provider: Arc<dyn Provider>, bus: Arc<MessageBus>) -> Self {
        let model = if config.provider.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.provider.model.clone()
        };

        let manager = Arc::new(
            SubagentManager::new(
                provider.clone(),
                &model,
                Some(config.workspace.clone()),
                config.tools.brave_api_key.clone(),
                bus.clone(),
            )
            .with_max_iterations(config.agent.subagent_max_iterations),
        );

        let context = ReplyContext::new();
        let workspace = Some(config.workspace.clone());
        let mut registry =
            hivebot_tools::main_registry(workspace.clone(), config.tools.brave_api_key.clone());

        // Re-register the limit-bearing tools with configured caps; the
        // registry keeps their original positions.
        registry.register(Box::new(
            hivebot_tools::ReadFileTool::new(workspace.clone())
                .with_max_size(config.tools.max_file_size),
        ));
        registry.register(Box::new(
            hivebot_tools::WriteFileTool::new(workspace.clone())
                .with_max_size(config.tools.max_file_size),
        ));
        registry.register(Box::new(
            hivebot_tools::EditFileTool::new(workspace.clone())
                .with_max_size(config.tools.max_file_size),
        ));
        registry.register(Box::new(
            hivebot_tools::ListDirTool::new(workspace.clone())
                .with_max_items(config.tools.max_dir_items),
        ));
        registry.register(Box::new(
            hivebot_tools::ExecTool::new(workspace)
                .with_timeout(Duration::from_secs(config.tools.exec_timeout_secs)),
        ));

        registry.register(Box::new(SendMessageTool::new(bus.clone(), context.clone())));
        registry.register(Box::new(SpawnSubagentTool::new(
            manager.clone(),
            context.clone(),
        )));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let agent = AgentLoop::new(
            provider,
            model,
            Arc::new(registry),
            build_main_prompt(&config.workspace),
            shutdown_rx.clone(),
        )
        .with_max_iterations(config.agent.max_iterations)
        .with_temperature(config.agent.temperature)
        .with_max_tokens(config.agent.max_tokens);

        Self {
            bus,
            agent,
            manager,
            context,
            conversations: HashMap::new(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// A handle that stops `run` from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// The subagent manager, for status queries from outside the runtime.
    pub fn subagent_manager(&self) -> Arc<SubagentManager> {
        self.manager.clone()
    }

    /// Consume the bus until it closes or shutdown is triggered.
    pub async fn run(mut self) -> Result<()> {
        let mut inbound = self.bus.take_inbound_receiver()?;
        let mut shutdown = self.shutdown_rx.clone();
        info!("Agent runtime started");

        loop {
            tokio::select! {
                msg = inbound.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => {
                            info!("Inbound channel closed, runtime stopping");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown triggered, runtime stopping");
                        break;
                    }
                }
            }
        }

        self.manager.shutdown(SHUTDOWN_GRACE).await;
        Ok(())
    }

    async fn handle_message(&mut self, msg: InboundMessage) {
        // Synthetic system-channel messages carry the original chat encoded
        // in their chat_id, so replies land where the task came from.
        let (channel, chat_id) = if msg.channel == SYSTEM_CHANNEL {
            match msg.chat_id.split_once(':') {
                Some((channel, chat_id)) => (channel.to_string(), chat_id.to_string()),
                None => (SYSTEM_CHANNEL.to_string(), msg.chat_id.clone()),
            }
        } else {
            (msg.channel.clone(), msg.chat_id.clone())
        };

        debug!(channel = %channel, chat_id = %chat_id, "Dispatching inbound message");
        self.context.set(&channel, &chat_id);

        let key = format!("{channel}:{chat_id}");
        let conversation = self
            .conversations
            .entry(key)
            .or_insert_with(Conversation::new);
        conversation.push(Message::user(&msg.content));

        let Some(reply) = self.agent.process(conversation).await else {
            return;
        };
        if reply.is_empty() {
            return;
        }

        let outbound = OutboundMessage {
            channel,
            chat_id,
            content: reply,
        };
        if let Err(e) = self.bus.publish_outbound(outbound) {
            warn!(error = %e, "Could not publish reply");
        }
    }
}

fn build_main_prompt(workspace: &Path) -> String {
    format!(
        "# Assistant\n\n\
         You are a helpful assistant with access to tools for working with \
         files, running shell commands, and searching the web.\n\n\
         ## Guidelines\n\
         - Use tools when they help; answer directly when they don't\n\
         - Use send_message for progress updates during long tasks\n\
         - Use spawn_subagent for tasks that should run in the background; \
         you will be notified when they finish\n\
         - Report tool failures honestly instead of guessing\n\n\
         ## Workspace\n\
         Your workspace is at: {}",
        workspace.display()
    )
}
