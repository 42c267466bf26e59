//! Terminal tool: run a command in the host shell.
//!
//! Commands are handed to the shell verbatim. Standard error is merged into
//! standard output so the model sees one stream, in the order it was written.

use async_trait::async_trait;
use sploitgpt_core::error::ToolError;
use sploitgpt_core::tool::{Tool, ToolArguments, ToolOutput, str_arg};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Build the platform shell invocation with stderr folded into stdout.
fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(format!("{command} 2>&1"));
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!("exec 2>&1\n{command}"));
        cmd
    }
}

/// `5s`, or `0.5s` when the duration has a fractional part.
fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}s", timeout.as_secs_f64())
    }
}

/// Run `command` and return its combined output as text. Never fails.
///
/// - empty output → `(no output)`
/// - deadline hit → the child is killed, `Command timed out after <n>s`
/// - launch failure → `Error: <cause>`
///
/// Dropping the returned future kills the child.
pub async fn run_shell(command: &str, timeout: Duration) -> String {
    debug!(command = %command, timeout_secs = timeout.as_secs(), "Executing shell command");

    let mut cmd = shell_command(command);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(command = %command, error = %e, "Failed to launch shell");
            return format!("Error: {e}");
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            if text.is_empty() {
                "(no output)".into()
            } else {
                text
            }
        }
        Ok(Err(e)) => format!("Error: {e}"),
        Err(_) => {
            warn!(command = %command, timeout_secs = timeout.as_secs(), "Command timed out");
            format!("Command timed out after {}", format_timeout(timeout))
        }
    }
}

/// Execute arbitrary shell commands.
pub struct TerminalTool {
    timeout: Duration,
}

impl TerminalTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TerminalTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &str { "terminal" }

    fn description(&self) -> &str {
        "Run a shell command in the Kali Linux environment"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 300)"
                }
            },
            "required": ["command"]
        })
    }

    fn announce(&self, arguments: &ToolArguments) -> Option<String> {
        let command = str_arg(arguments, "command");
        (!command.trim().is_empty()).then(|| command.to_string())
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let command = str_arg(arguments, "command");
        if command.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Missing 'command' argument".into()));
        }

        let timeout = arguments
            .get("timeout")
            .and_then(serde_json::Value::as_u64)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.timeout);

        Ok(ToolOutput::Text(run_shell(command, timeout).await))
    }
}
