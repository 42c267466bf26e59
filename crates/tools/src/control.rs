//! Control tools. They steer the agent loop instead of touching the host.

use async_trait::async_trait;
use sploitgpt_core::error::ToolError;
use sploitgpt_core::tool::{Tool, ToolArguments, ToolOutput, str_arg, str_list_arg};

/// Pause the turn and let the operator pick between alternatives.
pub struct AskUserTool;

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str { "ask_user" }

    fn description(&self) -> &str {
        "Ask the user to choose between multiple options"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to ask"
                },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of options for the user to choose from"
                }
            },
            "required": ["question", "options"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::AskUser {
            question: str_arg(arguments, "question").to_string(),
            options: str_list_arg(arguments, "options"),
        })
    }
}

/// End the task with a summary.
pub struct FinishTool;

#[async_trait]
impl Tool for FinishTool {
    fn name(&self) -> &str { "finish" }

    fn description(&self) -> &str {
        "Complete the task and provide a summary"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Summary of what was accomplished"
                }
            },
            "required": ["summary"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Finish {
            summary: str_arg(arguments, "summary").to_string(),
        })
    }
}
