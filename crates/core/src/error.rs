//! Error types for the SploitGPT domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Faults that end a response stream abnormally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Round limit exceeded: {limit} model calls without reaching a final answer")]
    RoundLimitExceeded { limit: u32 },

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Waiting for an answer to: {question}")]
    AwaitingUserChoice { question: String },

    #[error("Resume token does not match the pending question")]
    InvalidResumeToken,

    #[error("No question is pending")]
    NotSuspended,
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        Self::ModelCall(err.to_string())
    }
}
