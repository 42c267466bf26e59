//! Nmap tool: port and service scans with output saved to the loot directory.

use async_trait::async_trait;
use sploitgpt_core::error::ToolError;
use sploitgpt_core::tool::{Tool, ToolArguments, ToolOutput, str_arg};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::terminal::run_shell;

pub struct NmapScanTool {
    loot_dir: PathBuf,
    timeout: Duration,
}

impl NmapScanTool {
    pub fn new(loot_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            loot_dir: loot_dir.into(),
            timeout,
        }
    }

    /// `-oA` base path for a target: `/` and `.` become `_`.
    fn output_base(loot_dir: &Path, target: &str) -> PathBuf {
        loot_dir.join(format!("nmap_{}", target.replace(['/', '.'], "_")))
    }

    fn command_for(&self, arguments: &ToolArguments) -> String {
        let target = str_arg(arguments, "target");
        let ports = match str_arg(arguments, "ports") {
            "" => "-",
            p => p,
        };
        let options = match str_arg(arguments, "options") {
            "" => "-sV",
            o => o,
        };
        format!(
            "nmap {options} -p {ports} {target} -oA {}",
            Self::output_base(&self.loot_dir, target).display()
        )
    }
}

#[async_trait]
impl Tool for NmapScanTool {
    fn name(&self) -> &str { "nmap_scan" }

    fn description(&self) -> &str {
        "Scan a host or network with nmap and save the results"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "Host, range, or CIDR to scan"
                },
                "ports": {
                    "type": "string",
                    "description": "Port specification (default: all ports)"
                },
                "options": {
                    "type": "string",
                    "description": "Extra nmap flags (default: -sV)"
                }
            },
            "required": ["target"]
        })
    }

    fn announce(&self, arguments: &ToolArguments) -> Option<String> {
        let target = str_arg(arguments, "target");
        (!target.trim().is_empty()).then(|| self.command_for(arguments))
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        if str_arg(arguments, "target").trim().is_empty() {
            return Err(ToolError::InvalidArguments("Missing 'target' argument".into()));
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.loot_dir).await {
            warn!(dir = %self.loot_dir.display(), error = %e, "Could not create loot directory");
        }

        Ok(ToolOutput::Text(
            run_shell(&self.command_for(arguments), self.timeout).await,
        ))
    }
}
