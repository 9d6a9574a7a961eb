//! Shell execution tool with safety safeguards.
//!
//! Every command passes through the dangerous-command filter before it
//! reaches a shell. Blocked commands come back as error text so the model
//! sees why the call was refused.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use hivebot_core::error::ToolError;
use hivebot_core::tool::{Tool, ToolResult};
use hivebot_security::check_dangerous_command;

/// Default wall-clock limit for a single command, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Ceiling on returned output before truncation, in characters.
const MAX_OUTPUT_LEN: usize = 10_000;

pub struct ExecTool {
    working_dir: Option<PathBuf>,
    timeout: Duration,
    allow_dangerous: bool,
}

impl ExecTool {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self {
            working_dir,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allow_dangerous: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bypass the dangerous-command filter. Not recommended for untrusted
    /// input.
    pub fn with_allow_dangerous(mut self, allow: bool) -> Self {
        self.allow_dangerous = allow;
        self
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Use with caution."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if !self.allow_dangerous
            && let Some(danger) = check_dangerous_command(command)
        {
            warn!(command = %command, "Blocked dangerous command");
            return Ok(ToolResult::error(format!(
                "Error: {danger}. This command was blocked for security."
            )));
        }

        let cwd = arguments["working_dir"]
            .as_str()
            .map(PathBuf::from)
            .or_else(|| self.working_dir.clone());

        debug!(command = %command, cwd = ?cwd, "Executing shell command");

        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        if let Some(dir) = &cwd {
            cmd.current_dir(dir);
        }
        // Dropping the output future on timeout must kill the child too.
        cmd.kill_on_drop(true);

        let child = match cmd
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return Ok(ToolResult::error(format!("Error executing command: {e}")));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ToolResult::error(format!("Error executing command: {e}")));
            }
            Err(_) => {
                return Ok(ToolResult::error(format!(
                    "Error: Command timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        let mut parts = Vec::new();
        if !output.stdout.is_empty() {
            parts.push(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            parts.push(format!("STDERR:\n{stderr}"));
        }
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            parts.push(format!("\nExit code: {code}"));
        }

        let mut result = if parts.is_empty() {
            "(no output)".to_string()
        } else {
            parts.join("\n")
        };

        if result.len() > MAX_OUTPUT_LEN {
            // Avoid splitting a multi-byte character at the cut point.
            let mut cut = MAX_OUTPUT_LEN;
            while !result.is_char_boundary(cut) {
                cut -= 1;
            }
            let overflow = result[cut..].chars().count();
            result.truncate(cut);
            result.push_str(&format!("\n... (truncated, {overflow} more chars)"));
        }

        Ok(ToolResult::ok(result))
    }
}
