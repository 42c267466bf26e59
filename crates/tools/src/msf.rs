//! Metasploit tools: exploit search and module execution.

use async_trait::async_trait;
use sploitgpt_core::error::ToolError;
use sploitgpt_core::tool::{Tool, ToolArguments, ToolOutput, str_arg};
use std::time::Duration;

use crate::terminal::run_shell;

/// Search exploit modules with `searchsploit`.
pub struct MsfSearchTool {
    timeout: Duration,
}

impl MsfSearchTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command_for(query: &str) -> String {
        format!("searchsploit {query}")
    }
}

#[async_trait]
impl Tool for MsfSearchTool {
    fn name(&self) -> &str { "msf_search" }

    fn description(&self) -> &str {
        "Search Metasploit for exploit modules"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (e.g., 'apache', 'CVE-2021-44228')"
                }
            },
            "required": ["query"]
        })
    }

    fn announce(&self, arguments: &ToolArguments) -> Option<String> {
        let query = str_arg(arguments, "query");
        (!query.trim().is_empty()).then(|| Self::command_for(query))
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let query = str_arg(arguments, "query");
        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Missing 'query' argument".into()));
        }
        Ok(ToolOutput::Text(
            run_shell(&Self::command_for(query), self.timeout).await,
        ))
    }
}

/// Run a Metasploit module non-interactively through `msfconsole`.
pub struct MsfRunTool {
    timeout: Duration,
}

impl MsfRunTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// `set` statements render in key order so the command is stable.
    fn command_for(module: &str, options: Option<&serde_json::Map<String, serde_json::Value>>) -> String {
        let mut sets: Vec<(String, String)> = options
            .map(|opts| {
                opts.iter()
                    .map(|(k, v)| {
                        let value = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();
        sets.sort();

        let opts: String = sets
            .iter()
            .map(|(k, v)| format!("set {k} {v}; "))
            .collect();
        format!("msfconsole -q -x 'use {module}; {opts}run; exit'")
    }
}

#[async_trait]
impl Tool for MsfRunTool {
    fn name(&self) -> &str { "msf_run" }

    fn description(&self) -> &str {
        "Run a Metasploit module with the given options"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "module": {
                    "type": "string",
                    "description": "Module path (e.g., 'exploit/unix/ftp/vsftpd_234_backdoor')"
                },
                "options": {
                    "type": "object",
                    "description": "Module options such as RHOSTS and LHOST",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["module"]
        })
    }

    fn announce(&self, arguments: &ToolArguments) -> Option<String> {
        let module = str_arg(arguments, "module");
        (!module.trim().is_empty()).then(|| {
            Self::command_for(module, arguments.get("options").and_then(|o| o.as_object()))
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let module = str_arg(arguments, "module");
        if module.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Missing 'module' argument".into()));
        }
        let command = Self::command_for(module, arguments.get("options").and_then(|o| o.as_object()));
        Ok(ToolOutput::Text(run_shell(&command, self.timeout).await))
    }
}
