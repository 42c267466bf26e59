//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: run shell commands,
//! search exploit databases, ask the operator a question, or end the task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::ToolError;
use crate::message::ToolCall;
use crate::provider::ToolDefinition;

/// Tool arguments keyed by parameter name.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// What a tool hands back to the agent loop.
///
/// Most tools produce text. The two control variants let a tool steer the
/// loop without the loop knowing tool names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Plain text fed back to the model.
    Text(String),

    /// Pause the turn until the operator picks an answer.
    AskUser {
        question: String,
        options: Vec<String>,
    },

    /// End the turn with a summary.
    Finish { summary: String },
}

impl ToolOutput {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// The core Tool trait.
///
/// Each tool (terminal, msf_search, ask_user, finish, ...) implements this
/// trait. Tools are registered in the [`ToolRegistry`] and made available to
/// the agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "terminal", "msf_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Text shown to the operator before the call runs, if any.
    fn announce(&self, _arguments: &ToolArguments) -> Option<String> {
        None
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Read a string argument, defaulting to empty.
pub fn str_arg<'a>(arguments: &'a ToolArguments, key: &str) -> &'a str {
    arguments.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Read a list-of-strings argument, skipping non-string entries.
pub fn str_list_arg(arguments: &ToolArguments, key: &str) -> Vec<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// A registry of available tools.
///
/// Registration rejects duplicate names. The set of tools advertised to the
/// model is configured separately from the set that can be dispatched.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    advertised: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            advertised: Vec::new(),
        }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Set which tools are advertised to the model, in order.
    pub fn set_advertised<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.advertised = names.into_iter().map(Into::into).collect();
    }

    pub fn advertised(&self) -> &[String] {
        &self.advertised
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Definitions of the advertised tools (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.advertised
            .iter()
            .filter_map(|name| match self.tools.get(name) {
                Some(tool) => Some(tool.to_definition()),
                None => {
                    warn!(tool = %name, "Advertised tool is not registered, skipping");
                    None
                }
            })
            .collect()
    }

    /// Execute a tool call, surfacing failures as errors.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(&call.arguments).await
    }

    /// Execute a tool call; never fails.
    ///
    /// Unknown tools and executor faults come back as text so the model can
    /// read them and try something else.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        match self.execute(call).await {
            Ok(output) => output,
            Err(ToolError::NotFound(name)) => {
                warn!(tool = %name, "Model requested an unknown tool");
                ToolOutput::Text(format!("Error: Unknown tool '{name}'"))
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolOutput::Text(format!("Error executing {}: {e}", call.name))
            }
        }
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
