//! End-to-end lifecycle tests: a user request spawns a subagent, the
//! subagent works in the background and announces its result on the bus,
//! and the runtime turns that announcement into a reply to the original
//! chat.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use hivebot_agent::{AgentRuntime, SubagentManager, SubagentOrigin};
use hivebot_config::AppConfig;
use hivebot_core::bus::{InboundMessage, MessageBus};
use hivebot_core::message::Role;
use hivebot_core::provider::{ChatRequest, ChatResponse, Provider, ToolCallRequest};

/// Routes responses by conversation shape instead of call order, because
/// the main loop and the subagent call the provider concurrently.
struct RoutingProvider;

#[async_trait]
impl Provider for RoutingProvider {
    fn name(&self) -> &str {
        "routing"
    }

    fn default_model(&self) -> &str {
        "test-model"
    }

    async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("");

        // The subagent side: just do the work.
        if system.starts_with("# Subagent") {
            return text("Background research complete: found 3 articles.");
        }

        let last = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("");

        // The announcement turn.
        if last.contains("[Subagent") {
            return text("Your research is done: found 3 articles.");
        }

        // A tool result is already present, so acknowledge the spawn.
        if request.messages.iter().any(|m| m.role == Role::Tool) {
            return text("Kicked off the research in the background.");
        }

        // First sight of the user request: spawn a subagent.
        ChatResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "call_spawn".into(),
                name: "spawn_subagent".into(),
                arguments: serde_json::json!({
                    "task": "research the three latest articles",
                    "label": "research"
                }),
            }],
            finish_reason: "tool_calls".into(),
            usage: None,
        }
    }
}

fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: Some(content.into()),
        tool_calls: vec![],
        finish_reason: "stop".into(),
        usage: None,
    }
}

/// Hangs long enough that tasks are still running when cancelled.
struct SlowProvider;

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }
    fn default_model(&self) -> &str {
        "test-model"
    }
    async fn chat(&self, _request: ChatRequest) -> ChatResponse {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        text("too late")
    }
}

fn test_config(workspace: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.workspace = workspace.to_path_buf();
    config
}

#[tokio::test]
async fn spawn_work_announce_reply_round_trip() {
    let workspace = tempfile::tempdir().unwrap();
    let bus = Arc::new(MessageBus::new());
    let runtime = AgentRuntime::new(
        &test_config(workspace.path()),
        Arc::new(RoutingProvider),
        bus.clone(),
    );
    let shutdown = runtime.shutdown_handle();
    let mut outbound = bus.take_outbound_receiver().unwrap();

    let runtime_task = tokio::spawn(runtime.run());

    bus.publish_inbound(InboundMessage {
        channel: "telegram".into(),
        sender_id: "user-1".into(),
        chat_id: "chat-7".into(),
        content: "please research the latest articles".into(),
    })
    .unwrap();

    // Immediate acknowledgement while the subagent works.
    let ack = tokio::time::timeout(Duration::from_secs(5), outbound.recv())
        .await
        .expect("ack should arrive")
        .unwrap();
    assert_eq!(ack.channel, "telegram");
    assert_eq!(ack.chat_id, "chat-7");
    assert_eq!(ack.content, "Kicked off the research in the background.");

    // The subagent's announcement re-enters the bus and produces a second
    // reply to the same chat.
    let followup = tokio::time::timeout(Duration::from_secs(5), outbound.recv())
        .await
        .expect("follow-up should arrive")
        .unwrap();
    assert_eq!(followup.channel, "telegram");
    assert_eq!(followup.chat_id, "chat-7");
    assert_eq!(followup.content, "Your research is done: found 3 articles.");

    shutdown.trigger();
    runtime_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn cancelled_subagent_never_announces() {
    let bus = Arc::new(MessageBus::new());
    let mut inbound = bus.take_inbound_receiver().unwrap();
    let manager = SubagentManager::new(
        Arc::new(SlowProvider),
        "test-model",
        None,
        None,
        bus.clone(),
    );

    manager.spawn(
        "a long piece of work",
        None,
        SubagentOrigin {
            channel: "cli".into(),
            chat_id: "direct".into(),
        },
    );
    let ids = manager.get_running_tasks();
    assert_eq!(ids.len(), 1);
    assert!(manager.cancel_task(&ids[0]));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.get_running_count(), 0);
    assert!(inbound.try_recv().is_err(), "no announcement after cancel");
}

#[tokio::test]
async fn shutdown_drains_all_tasks_and_manager_stays_usable() {
    let bus = Arc::new(MessageBus::new());
    let manager = SubagentManager::new(
        Arc::new(SlowProvider),
        "test-model",
        None,
        None,
        bus.clone(),
    );

    let origin = SubagentOrigin {
        channel: "cli".into(),
        chat_id: "direct".into(),
    };
    for i in 0..4 {
        let ack = manager.spawn(&format!("task {i}"), None, origin.clone());
        assert!(ack.contains("started"));
    }
    assert_eq!(manager.get_running_count(), 4);

    manager.shutdown(Duration::from_secs(2)).await;
    assert_eq!(manager.get_running_count(), 0);

    let ack = manager.spawn("after shutdown", None, origin);
    assert!(ack.contains("started"), "manager should be reusable: {ack}");
    manager.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn cancel_unknown_id_is_a_clean_false() {
    let bus = Arc::new(MessageBus::new());
    let manager = SubagentManager::new(Arc::new(SlowProvider), "test-model", None, None, bus);
    assert!(!manager.cancel_task("deadbeef"));
}
