//! Subagent manager for background task execution.
//!
//! Subagents are lightweight agent loop instances that run as background
//! tasks. They share the main agent's provider but get an isolated
//! conversation, a focused task prompt, a restricted tool set (no
//! messaging, no recursive spawning), and a lower iteration cap. Results
//! come back to the main agent as synthetic messages on the bus rather
//! than going to the user directly.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hivebot_core::bus::{InboundMessage, MessageBus, SYSTEM_CHANNEL};
use hivebot_core::message::{Conversation, Message};
use hivebot_core::provider::Provider;

use crate::loop_runner::AgentLoop;

/// Where a subagent's completion announcement should be routed.
#[derive(Debug, Clone)]
pub struct SubagentOrigin {
    pub channel: String,
    pub chat_id: String,
}

impl Default for SubagentOrigin {
    fn default() -> Self {
        Self {
            channel: "cli".into(),
            chat_id: "direct".into(),
        }
    }
}

type TaskTable = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// Manages background subagent execution.
pub struct SubagentManager {
    provider: Arc<dyn Provider>,
    model: String,
    workspace: Option<PathBuf>,
    brave_api_key: Option<String>,
    bus: Arc<MessageBus>,
    max_iterations: u32,
    running: TaskTable,
    draining: watch::Sender<bool>,
}

impl SubagentManager {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        workspace: Option<PathBuf>,
        brave_api_key: Option<String>,
        bus: Arc<MessageBus>,
    ) -> Self {
        let (draining, _) = watch::channel(false);
        Self {
            provider,
            model: model.into(),
            workspace,
            brave_api_key,
            bus,
            max_iterations: 15,
            running: Arc::new(Mutex::new(HashMap::new())),
            draining,
        }
    }

    /// Set the iteration cap for spawned subagents.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Spawn a subagent to execute a task in the background.
    ///
    /// Returns an acknowledgement string for the model. During shutdown no
    /// task is created and the ack is an error string instead.
    pub fn spawn(&self, task: &str, label: Option<&str>, origin: SubagentOrigin) -> String {
        if *self.draining.borrow() {
            return "Error: Cannot spawn subagent during shutdown.".into();
        }

        let task_id = format!("{:08x}", rand::random::<u32>());
        let display_label = match label {
            Some(l) => l.to_string(),
            None => {
                let short: String = task.chars().take(30).collect();
                if task.chars().count() > 30 {
                    format!("{short}...")
                } else {
                    short
                }
            }
        };

        let run = SubagentRun {
            task_id: task_id.clone(),
            task: task.to_string(),
            label: display_label.clone(),
            origin,
            provider: self.provider.clone(),
            model: self.model.clone(),
            workspace: self.workspace.clone(),
            brave_api_key: self.brave_api_key.clone(),
            bus: self.bus.clone(),
            max_iterations: self.max_iterations,
            shutdown: self.draining.subscribe(),
            table: self.running.clone(),
        };

        // Hold the table lock across the spawn so the task's cleanup guard
        // cannot race ahead of the insert. The draining flag is re-checked
        // under the lock so a shutdown that started in the meantime wins.
        {
            let mut table = self.running.lock().expect("subagent table lock poisoned");
            if *self.draining.borrow() {
                return "Error: Cannot spawn subagent during shutdown.".into();
            }
            let handle = tokio::spawn(run.execute());
            table.insert(task_id.clone(), handle);
        }

        info!(task_id = %task_id, label = %display_label, "Spawned subagent");
        format!("Subagent [{display_label}] started (id: {task_id}). I'll notify you when it completes.")
    }

    /// Cancel a specific subagent task. Returns true if the task was found
    /// and still running.
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let handle = self
            .running
            .lock()
            .expect("subagent table lock poisoned")
            .remove(task_id);
        match handle {
            Some(h) if !h.is_finished() => {
                h.abort();
                info!(task_id = %task_id, "Cancelled subagent");
                true
            }
            _ => false,
        }
    }

    /// Gracefully shut down all running subagents.
    ///
    /// Sets the draining flag (blocking new spawns) before anything else,
    /// aborts every running task in place, and waits up to `timeout` for
    /// them to wind down. Entries stay in the tracking table while their
    /// tasks unwind, so the running count stays accurate throughout; each
    /// task's cleanup guard removes its own entry. The draining flag is
    /// reset afterwards, so the manager can be reused.
    pub async fn shutdown(&self, timeout: Duration) {
        let count = {
            let table = self.running.lock().expect("subagent table lock poisoned");
            self.draining.send_replace(true);
            for handle in table.values() {
                handle.abort();
            }
            table.len()
        };

        if count == 0 {
            info!("No subagents to shut down");
            self.draining.send_replace(false);
            return;
        }

        info!(count, "Shutting down subagents");

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.get_running_count() == 0 {
                info!(count, "All subagents shut down cleanly");
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                let stragglers = self.get_running_count();
                warn!(
                    stragglers,
                    timeout_secs = timeout.as_secs(),
                    "Shutdown timeout, force-clearing straggler entries"
                );
                self.running
                    .lock()
                    .expect("subagent table lock poisoned")
                    .clear();
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        self.draining.send_replace(false);
    }

    /// Number of currently running subagents.
    pub fn get_running_count(&self) -> usize {
        self.running
            .lock()
            .expect("subagent table lock poisoned")
            .len()
    }

    /// IDs of currently running subagent tasks.
    pub fn get_running_tasks(&self) -> Vec<String> {
        self.running
            .lock()
            .expect("subagent table lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn set_draining(&self, value: bool) {
        self.draining.send_replace(value);
    }
}

/// Everything one background run needs, detached from the manager.
struct SubagentRun {
    task_id: String,
    task: String,
    label: String,
    origin: SubagentOrigin,
    provider: Arc<dyn Provider>,
    model: String,
    workspace: Option<PathBuf>,
    brave_api_key: Option<String>,
    bus: Arc<MessageBus>,
    max_iterations: u32,
    shutdown: watch::Receiver<bool>,
    table: TaskTable,
}

impl SubagentRun {
    async fn execute(self) {
        // Removes this task from the tracking table on every exit path,
        // including abort (the guard drops with the future).
        let _guard = TaskGuard {
            id: self.task_id.clone(),
            table: self.table.clone(),
        };

        info!(task_id = %self.task_id, label = %self.label, "Subagent starting task");

        // A panic inside the run must not vanish silently; the origin chat
        // still gets a failure announcement.
        match AssertUnwindSafe(self.run()).catch_unwind().await {
            Ok(None) => {
                info!(task_id = %self.task_id, "Subagent stopping due to shutdown");
            }
            Ok(Some(result)) => {
                let failed = result.starts_with("Error calling LLM:");
                if failed {
                    warn!(task_id = %self.task_id, "Subagent finished with a provider error");
                } else {
                    info!(task_id = %self.task_id, "Subagent completed successfully");
                }
                self.announce_result(&result, failed);
            }
            Err(payload) => {
                let reason = panic_text(payload);
                error!(task_id = %self.task_id, reason = %reason, "Subagent crashed");
                self.announce_result(&format!("Subagent crashed: {reason}"), true);
            }
        }
    }

    async fn run(&self) -> Option<String> {
        let registry = Arc::new(hivebot_tools::subagent_registry(
            self.workspace.clone(),
            self.brave_api_key.clone(),
        ));
        let prompt = build_subagent_prompt(&self.task, self.workspace.as_deref());
        let agent = AgentLoop::new(
            self.provider.clone(),
            &self.model,
            registry,
            prompt,
            self.shutdown.clone(),
        )
        .with_max_iterations(self.max_iterations);

        let mut conversation = Conversation::new();
        conversation.push(Message::user(&self.task));
        agent.process(&mut conversation).await
    }

    /// Announce the result to the main agent via the message bus.
    fn announce_result(&self, result: &str, failed: bool) {
        let status_text = if failed {
            "failed"
        } else {
            "completed successfully"
        };

        let content = format!(
            "[Subagent '{}' {}]\n\n\
             Task: {}\n\n\
             Result:\n{}\n\n\
             Summarize this naturally for the user. Keep it brief (1-2 sentences). \
             Do not mention technical details like \"subagent\" or task IDs.",
            self.label, status_text, self.task, result
        );

        let msg = InboundMessage {
            channel: SYSTEM_CHANNEL.into(),
            sender_id: "subagent".into(),
            chat_id: format!("{}:{}", self.origin.channel, self.origin.chat_id),
            content,
        };

        match self.bus.publish_inbound(msg) {
            Ok(()) => debug!(
                task_id = %self.task_id,
                origin = %format!("{}:{}", self.origin.channel, self.origin.chat_id),
                "Subagent announced result"
            ),
            Err(e) => warn!(task_id = %self.task_id, error = %e, "Could not announce result"),
        }
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

struct TaskGuard {
    id: String,
    table: TaskTable,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.lock() {
            table.remove(&self.id);
            debug!(task_id = %self.id, "Subagent cleaned up");
        }
    }
}

/// Build the focused system prompt for a subagent.
fn build_subagent_prompt(task: &str, workspace: Option<&Path>) -> String {
    let workspace_line = match workspace {
        Some(path) => format!("Your workspace is at: {}", path.display()),
        None => "You have no workspace restriction.".into(),
    };

    format!(
        "# Subagent\n\n\
         You are a subagent spawned by the main agent to complete a specific task.\n\n\
         ## Your Task\n{task}\n\n\
         ## Rules\n\
         1. Stay focused - complete only the assigned task, nothing else\n\
         2. Your final response will be reported back to the main agent\n\
         3. Do not initiate conversations or take on side tasks\n\
         4. Be concise but informative in your findings\n\n\
         ## What You Can Do\n\
         - Read and write files in the workspace\n\
         - Execute shell commands\n\
         - Search the web and fetch web pages\n\n\
         ## What You Cannot Do\n\
         - Send messages directly to users (no message tool available)\n\
         - Spawn other subagents\n\
         - Access the main agent's conversation history\n\n\
         ## Workspace\n{workspace_line}\n\n\
         When you have completed the task, provide a clear summary of your findings or actions."
    )
}
