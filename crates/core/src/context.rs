//! Environment context consumed by the agent.
//!
//! The boot step fills a [`BootContext`] once and may refresh it later (for
//! example when new hosts are discovered). The agent only ever reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A network interface as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub state: String,
    pub addr: String,
}

/// Read-only snapshot of the operating environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootContext {
    pub hostname: String,
    pub username: String,

    #[serde(default)]
    pub interfaces: Vec<Interface>,

    /// Security tools found on `PATH`
    #[serde(default)]
    pub available_tools: Vec<String>,

    #[serde(default)]
    pub missing_tools: Vec<String>,

    /// Targets discovered by earlier reconnaissance
    #[serde(default)]
    pub known_hosts: Vec<String>,

    #[serde(default)]
    pub open_ports: BTreeMap<String, Vec<u16>>,

    pub msf_connected: bool,
    pub model_connected: bool,
}

impl BootContext {
    /// Known hosts joined for display, or "None".
    pub fn known_hosts_display(&self) -> String {
        if self.known_hosts.is_empty() {
            "None".into()
        } else {
            self.known_hosts.join(", ")
        }
    }

    /// Render the environment facts section of the system prompt.
    pub fn render(&self) -> String {
        format!(
            "## Current Context\n\
             - Hostname: {}\n\
             - User: {}\n\
             - Known hosts: {}\n\
             - Available tools: {} tools ready\n\
             - Metasploit: {}\n",
            self.hostname,
            self.username,
            self.known_hosts_display(),
            self.available_tools.len(),
            if self.msf_connected { "Connected" } else { "Not available" },
        )
    }
}
