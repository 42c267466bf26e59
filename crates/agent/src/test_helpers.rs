//! Shared test helpers: a scripted provider and in-memory tools.

use async_trait::async_trait;
use sploitgpt_core::error::{ProviderError, ToolError};
use sploitgpt_core::message::{Message, ToolCall};
use sploitgpt_core::provider::{Provider, ProviderRequest, ProviderResponse};
use sploitgpt_core::tool::{Tool, ToolArguments, ToolOutput, ToolRegistry, str_arg, str_list_arg};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the request. Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The `n`th request the provider saw.
    pub fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut replies = self.replies.lock().unwrap();
        let n = requests.len();
        requests.push(request);

        if replies.is_empty() {
            panic!("SequentialMockProvider: no more replies (call #{n})");
        }
        replies.remove(0)
    }
}

/// A provider whose replies never arrive.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(text: &str, calls: Vec<ToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_calls(text, calls),
        model: "mock-model".into(),
    }
}

/// A tool call with arguments given as a JSON string.
pub fn call(name: &str, arguments: &str) -> ToolCall {
    ToolCall::from_raw(name, &serde_json::Value::String(arguments.into()))
}

/// Understands `echo <text>` and nothing else.
pub struct FakeTerminal;

#[async_trait]
impl Tool for FakeTerminal {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Execute a shell command"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "command": { "type": "string" } },
            "required": ["command"]
        })
    }

    fn announce(&self, arguments: &ToolArguments) -> Option<String> {
        Some(str_arg(arguments, "command").to_string())
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let command = str_arg(arguments, "command");
        match command.strip_prefix("echo ") {
            Some(text) => Ok(ToolOutput::Text(format!("{text}\n"))),
            None => Err(ToolError::ExecutionFailed {
                tool_name: "terminal".into(),
                reason: format!("unsupported command: {command}"),
            }),
        }
    }
}

pub struct FakeAskUser;

#[async_trait]
impl Tool for FakeAskUser {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn description(&self) -> &str {
        "Ask the user to choose between multiple options"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::AskUser {
            question: str_arg(arguments, "question").to_string(),
            options: str_list_arg(arguments, "options"),
        })
    }
}

pub struct FakeFinish;

#[async_trait]
impl Tool for FakeFinish {
    fn name(&self) -> &str {
        "finish"
    }

    fn description(&self) -> &str {
        "Complete the task and provide a summary"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Finish {
            summary: str_arg(arguments, "summary").to_string(),
        })
    }
}

pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(FakeTerminal)).unwrap();
    registry.register(Box::new(FakeAskUser)).unwrap();
    registry.register(Box::new(FakeFinish)).unwrap();
    registry.set_advertised(["terminal", "ask_user", "finish"]);
    registry
}
