//! Built-in tool implementations for hivebot.
//!
//! Tools give the agent the ability to interact with the world: read and
//! edit files, run shell commands, search the web, fetch pages. Every tool
//! wraps the security filters from `hivebot-security` and reports failures
//! as `Error:`-prefixed result text rather than propagating errors.

pub mod exec;
pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod list_dir;
pub mod web_fetch;
pub mod web_search;

use std::path::PathBuf;

use hivebot_core::tool::ToolRegistry;

pub use exec::ExecTool;
pub use file_edit::EditFileTool;
pub use file_read::ReadFileTool;
pub use file_write::WriteFileTool;
pub use list_dir::ListDirTool;
pub use web_fetch::WebFetchTool;
pub use web_search::WebSearchTool;

/// Default size ceiling for file content, in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Build the registry handed to the main agent loop.
///
/// The messaging and spawn tools are registered separately by the runtime,
/// which owns the bus and the subagent manager.
pub fn main_registry(workspace: Option<PathBuf>, brave_api_key: Option<String>) -> ToolRegistry {
    base_registry(workspace, brave_api_key)
}

/// Build the restricted registry used by background subagents: file I/O,
/// shell, and web only. Deliberately excludes the messaging and spawn
/// tools so subagents cannot message users directly or spawn recursively.
pub fn subagent_registry(
    workspace: Option<PathBuf>,
    brave_api_key: Option<String>,
) -> ToolRegistry {
    base_registry(workspace, brave_api_key)
}

fn base_registry(workspace: Option<PathBuf>, brave_api_key: Option<String>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadFileTool::new(workspace.clone())));
    registry.register(Box::new(WriteFileTool::new(workspace.clone())));
    registry.register(Box::new(EditFileTool::new(workspace.clone())));
    registry.register(Box::new(ListDirTool::new(workspace.clone())));
    registry.register(Box::new(ExecTool::new(workspace)));
    registry.register(Box::new(WebSearchTool::new(brave_api_key)));
    registry.register(Box::new(WebFetchTool::new()));
    registry
}
