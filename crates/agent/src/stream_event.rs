//! Events emitted by the agent while it works through one instruction.

use serde::{Deserialize, Serialize};

use crate::session::ResumeToken;

/// One element of a turn's response stream.
///
/// - `message`: text the model wrote
/// - `command`: a command about to run
/// - `result`: tool output
/// - `choice`: the model wants the operator to pick an option; the turn is
///   suspended until [`AgentLoop::resume`](crate::AgentLoop::resume)
/// - `error`: the turn failed
/// - `done`: the model finished the task
///
/// At most one `error` or `done` closes a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Message { content: String },

    Command { command: String },

    Result { output: String },

    Choice {
        question: String,
        options: Vec<String>,
        token: ResumeToken,
    },

    Error { message: String },

    Done { summary: String },
}

impl AgentEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Command { .. } => "command",
            Self::Result { .. } => "result",
            Self::Choice { .. } => "choice",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    /// Whether this event closes the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done { .. })
    }
}
