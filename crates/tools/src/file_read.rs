//! File read tool: read file contents with path validation and a size cap.

use async_trait::async_trait;
use std::path::PathBuf;

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};
use hivebot_security::sanitize_path;

use crate::MAX_FILE_SIZE;

pub struct ReadFileTool {
    /// Workspace root the tool is confined to. `None` = unrestricted.
    workspace: Option<PathBuf>,
    max_size: u64,
}

impl ReadFileTool {
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
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The file path to read" }
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
            return Ok(ToolResult::error("Error: File not found"));
        }
        if !resolved.is_file() {
            return Ok(ToolResult::error("Error: Not a file"));
        }

        // Check the size before reading anything into memory.
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.len() > self.max_size => {
                return Ok(ToolResult::error(format!(
                    "Error: File too large ({} bytes, max {})",
                    meta.len(),
                    self.max_size
                )));
            }
            Ok(_) => {}
            Err(e) => return Ok(ToolResult::error(io_error_text(&e, "read"))),
        }

        match tokio::fs::read(&resolved).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => Ok(ToolResult::ok(content)),
                Err(_) => Ok(ToolResult::error("Error: File is not valid UTF-8 text")),
            },
            Err(e) => Ok(ToolResult::error(io_error_text(&e, "read"))),
        }
    }
}

pub(crate) fn io_error_text(e: &std::io::Error, verb: &str) -> String {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        "Error: Permission denied".into()
    } else {
        format!("Error: Could not {verb} file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tool_definition() {
        let tool = ReadFileTool::new(None);
        assert_eq!(tool.name(), "read_file");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path"]));
    }

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(serde_json::json!({ "path": file_path.to_str().unwrap() }))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("Hello, world!"));
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(serde_json::json!({
                "path": dir.path().join("missing.txt").to_str().unwrap()
            }))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, "Error: File not found");
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(serde_json::json!({ "path": dir.path().to_str().unwrap() }))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, "Error: Not a file");
    }

    #[tokio::test]
    async fn oversized_file_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("big.txt");
        std::fs::write(&file_path, "0123456789").unwrap();

        let tool = ReadFileTool::new(None).with_max_size(4);
        let result = tool
            .execute(serde_json::json!({ "path": file_path.to_str().unwrap() }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("File too large"));
    }

    #[tokio::test]
    async fn non_utf8_file_reports_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("binary.dat");
        std::fs::write(&file_path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(serde_json::json!({ "path": file_path.to_str().unwrap() }))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, "Error: File is not valid UTF-8 text");
    }

    #[tokio::test]
    async fn blocked_path_reported_as_text() {
        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(serde_json::json!({ "path": "/home/user/.ssh/id_rsa" }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.starts_with("Error:"));
        assert!(result.output.contains("blocked"));
    }

    #[tokio::test]
    async fn outside_workspace_reported_as_text() {
        let workspace = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file_path = elsewhere.path().join("secret.txt");
        std::fs::write(&file_path, "x").unwrap();

        let tool = ReadFileTool::new(Some(workspace.path().to_path_buf()));
        let result = tool
            .execute(serde_json::json!({ "path": file_path.to_str().unwrap() }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("workspace"));
    }

    #[tokio::test]
    async fn missing_path_argument() {
        let tool = ReadFileTool::new(None);
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
