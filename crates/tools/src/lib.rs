//! Built-in tool implementations for SploitGPT.
//!
//! Tools give the agent the ability to act on the host: run shell commands,
//! search and run Metasploit modules, scan with nmap. Two control tools
//! (`ask_user`, `finish`) let the model pause or end a turn.

pub mod control;
pub mod msf;
pub mod nmap;
pub mod terminal;

use sploitgpt_config::ToolsConfig;
use sploitgpt_core::error::ToolError;
use sploitgpt_core::tool::ToolRegistry;
use std::time::Duration;

pub use control::{AskUserTool, FinishTool};
pub use msf::{MsfRunTool, MsfSearchTool};
pub use nmap::NmapScanTool;
pub use terminal::{TerminalTool, run_shell};

/// Create the default tool registry with all built-in tools.
///
/// Every tool is registered; only `config.advertised` is offered to the model.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let short = Duration::from_secs(config.terminal_timeout_secs);
    let long = Duration::from_secs(config.long_timeout_secs);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(TerminalTool::new(short)))?;
    registry.register(Box::new(AskUserTool))?;
    registry.register(Box::new(MsfSearchTool::new(short)))?;
    registry.register(Box::new(FinishTool))?;
    registry.register(Box::new(MsfRunTool::new(long)))?;
    registry.register(Box::new(NmapScanTool::new(&config.loot_dir, long)))?;
    registry.set_advertised(config.advertised.iter().cloned());
    Ok(registry)
}
