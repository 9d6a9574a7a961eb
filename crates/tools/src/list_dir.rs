//! Directory listing tool.

use async_trait::async_trait;
use std::path::PathBuf;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};
use hivebot_security::sanitize_path;

/// Default ceiling on listed entries before the output is truncated.
pub const MAX_DIR_ITEMS: usize = 1000;

pub struct ListDirTool {
    workspace: Option<PathBuf>,
    max_items: usize,
}

impl ListDirTool {
    pub fn new(workspace: Option<PathBuf>) -> Self {
        Self {
            workspace,
            max_items: MAX_DIR_ITEMS,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The directory path to list" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = match sanitize_path(path, self.workspace.as_deref()) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(format!("Error: {e}"))),
        };

        if !resolved.exists() {
            return Ok(ToolResult::error("Error: Directory not found"));
        }
        if !resolved.is_dir() {
            return Ok(ToolResult::error("Error: Not a directory"));
        }

        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Ok(ToolResult::error("Error: Permission denied"));
                }
                return Ok(ToolResult::error("Error: Could not list directory"));
            }
        };
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry
                        .file_type()
                        .await
                        .map(|t| t.is_dir())
                        .unwrap_or(false);
                    entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
                }
                Ok(None) => break,
                Err(_) => return Ok(ToolResult::error("Error: Could not list directory")),
            }
        }

        if entries.is_empty() {
            return Ok(ToolResult::ok("Directory is empty"));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut lines = Vec::new();
        for (i, (name, is_dir)) in entries.iter().enumerate() {
            if i >= self.max_items {
                lines.push(format!("... ({}+ items, truncated)", self.max_items));
                break;
            }
            let prefix = if *is_dir { "📁 " } else { "📄 " };
            lines.push(format!("{prefix}{name}"));
        }

        Ok(ToolResult::ok(lines.join("\n")))
    }
}
