//! File write tool: write or create files with path validation.
//!
//! The size ceiling is checked before any filesystem mutation: an
//! oversized write leaves no partial file and no new directories behind.

use async_trait::async_trait;
use std::path::PathBuf;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};
use hivebot_security::sanitize_path;

use crate::MAX_FILE_SIZE;
use crate::file_read::io_error_text;

pub struct WriteFileTool {
    workspace: Option<PathBuf>,
    max_size: u64,
}

impl WriteFileTool {
    pub fn new(workspace: Option<PathBuf>) -> Self {
        Self {
            workspace,
            max_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path. Creates parent directories if needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The file path to write to" },
                "content": { "type": "string", "description": "The content to write" }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = match sanitize_path(path, self.workspace.as_deref()) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(format!("Error: {e}"))),
        };

        if content.len() as u64 > self.max_size {
            return Ok(ToolResult::error(format!(
                "Error: Content too large (max {} bytes)",
                self.max_size
            )));
        }

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::error(io_error_text(&e, "write")));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Successfully wrote {} bytes",
                content.len()
            ))),
            Err(e) => Ok(ToolResult::error(io_error_text(&e, "write"))),
        }
    }
}
