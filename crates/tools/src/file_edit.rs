//! File edit tool: replace an exact text fragment in a file.
//!
//! The target text must appear exactly once. Zero occurrences is an error;
//! multiple occurrences come back as a warning asking for more context,
//! with the file left untouched. This makes edits deliberately
//! non-idempotent: repeating a successful edit reports not-found, because
//! the old text no longer exists.

use async_trait::async_trait;
use std::path::PathBuf;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};
use hivebot_security::sanitize_path;

use crate::MAX_FILE_SIZE;
use crate::file_read::io_error_text;

pub struct EditFileTool {
    workspace: Option<PathBuf>,
    max_size: u64,
}

impl EditFileTool {
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
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing old_text with new_text. The old_text must exist exactly once in the file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The file path to edit" },
                "old_text": {
                    "type": "string",
                    "description": "The exact text to find and replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "The text to replace with"
                }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let old_text = arguments["old_text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'old_text' argument".into()))?;
        let new_text = arguments["new_text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'new_text' argument".into()))?;

        let resolved = match sanitize_path(path, self.workspace.as_deref()) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(format!("Error: {e}"))),
        };

        if !resolved.is_file() {
            return Ok(ToolResult::error("Error: File not found"));
        }

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.len() > self.max_size => {
                return Ok(ToolResult::error(format!(
                    "Error: File too large (max {} bytes)",
                    self.max_size
                )));
            }
            Ok(_) => {}
            Err(e) => return Ok(ToolResult::error(io_error_text(&e, "edit"))),
        }

        let content = match tokio::fs::read(&resolved).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(_) => return Ok(ToolResult::error("Error: File is not valid UTF-8 text")),
            },
            Err(e) => return Ok(ToolResult::error(io_error_text(&e, "edit"))),
        };

        let count = content.matches(old_text).count();
        if count == 0 {
            return Ok(ToolResult::error(
                "Error: old_text not found in file. Make sure it matches exactly.",
            ));
        }
        if count > 1 {
            return Ok(ToolResult::error(format!(
                "Warning: old_text appears {count} times. Please provide more context to make it unique."
            )));
        }

        let new_content = content.replacen(old_text, new_text, 1);
        match tokio::fs::write(&resolved, new_content).await {
            Ok(()) => Ok(ToolResult::ok("Successfully edited file")),
            Err(e) => Ok(ToolResult::error(io_error_text(&e, "edit"))),
        }
    }
}
