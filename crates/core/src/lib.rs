//! # SploitGPT Core
//!
//! Domain types, traits, and error definitions for the SploitGPT agent runtime.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that the provider, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping the model backend without touching the agent loop
//! - Isolated test registries with fake tools and scripted providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::BootContext;
pub use error::{AgentError, ProviderError, ToolError};
pub use message::{ConversationLog, Message, Role, ToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolArguments, ToolOutput, ToolRegistry};
