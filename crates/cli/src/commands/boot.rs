//! Gather the environment context the agent sees in its system prompt.

use sploitgpt_config::AppConfig;
use sploitgpt_core::context::{BootContext, Interface};
use sploitgpt_core::provider::Provider;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Security tools the agent is expected to drive through the terminal.
pub const SECURITY_TOOLS: &[&str] = &[
    "nmap",
    "msfconsole",
    "searchsploit",
    "sqlmap",
    "gobuster",
    "hydra",
    "nikto",
    "ffuf",
    "nc",
    "curl",
];

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Probe the host, Metasploit, and the model server.
pub async fn gather(config: &AppConfig, provider: &dyn Provider) -> BootContext {
    let path = std::env::var_os("PATH").unwrap_or_default();
    let (available_tools, missing_tools) = tools_on_path(SECURITY_TOOLS, &path);

    let mut context = BootContext {
        hostname: hostname(),
        username: username(),
        interfaces: interfaces(Path::new("/sys/class/net")),
        available_tools,
        missing_tools,
        ..Default::default()
    };
    refresh(&mut context, config, provider).await;

    debug!(
        hostname = %context.hostname,
        tools = context.available_tools.len(),
        msf = context.msf_connected,
        model = context.model_connected,
        "Boot context gathered"
    );
    context
}

/// Re-check the services that can come and go during a session.
pub async fn refresh(context: &mut BootContext, config: &AppConfig, provider: &dyn Provider) {
    context.msf_connected = port_open(&config.msf.host, config.msf.port).await;
    context.model_connected = matches!(
        tokio::time::timeout(PROBE_TIMEOUT, provider.health_check()).await,
        Ok(Ok(true))
    );
}

/// Split `candidates` into those found on `path` and those missing.
pub fn tools_on_path(candidates: &[&str], path: &OsStr) -> (Vec<String>, Vec<String>) {
    let dirs: Vec<_> = std::env::split_paths(path).collect();
    let mut available = Vec::new();
    let mut missing = Vec::new();

    for name in candidates {
        if dirs.iter().any(|dir| dir.join(name).is_file()) {
            available.push(name.to_string());
        } else {
            missing.push(name.to_string());
        }
    }
    (available, missing)
}

async fn port_open(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "unknown".into())
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".into())
}

/// Network interfaces from a sysfs-style directory, loopback excluded.
fn interfaces(sys_net: &Path) -> Vec<Interface> {
    let Ok(entries) = std::fs::read_dir(sys_net) else {
        return Vec::new();
    };

    let mut found: Vec<Interface> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                return None;
            }
            let state = std::fs::read_to_string(entry.path().join("operstate"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "unknown".into());
            Some(Interface {
                name,
                state,
                addr: String::new(),
            })
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}
