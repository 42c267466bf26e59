//! Configuration loading, validation, and management for SploitGPT.
//!
//! Loads configuration from `~/.sploitgpt/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sploitgpt/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,

    /// Model to chat with
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout for one model call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool executor settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Metasploit RPC endpoint
    #[serde(default)]
    pub msf: MsfConfig,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "qwen2.5:7b".into()
}
fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per user instruction
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_max_rounds() -> u32 {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Default timeout for `terminal` and `msf_search`
    #[serde(default = "default_terminal_timeout")]
    pub terminal_timeout_secs: u64,

    /// Timeout for long-running scans and exploit modules
    #[serde(default = "default_long_timeout")]
    pub long_timeout_secs: u64,

    /// Where scan output is written
    #[serde(default = "default_loot_dir")]
    pub loot_dir: PathBuf,

    /// Tools whose schemas are sent to the model, in order
    #[serde(default = "default_advertised")]
    pub advertised: Vec<String>,
}

fn default_terminal_timeout() -> u64 {
    300
}
fn default_long_timeout() -> u64 {
    600
}
fn default_loot_dir() -> PathBuf {
    PathBuf::from("/app/loot")
}
fn default_advertised() -> Vec<String> {
    vec![
        "terminal".into(),
        "ask_user".into(),
        "msf_search".into(),
        "finish".into(),
    ]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            terminal_timeout_secs: default_terminal_timeout(),
            long_timeout_secs: default_long_timeout(),
            loot_dir: default_loot_dir(),
            advertised: default_advertised(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsfConfig {
    #[serde(default = "default_msf_host")]
    pub host: String,

    #[serde(default = "default_msf_port")]
    pub port: u16,
}

fn default_msf_host() -> String {
    "127.0.0.1".into()
}
fn default_msf_port() -> u16 {
    55553
}

impl Default for MsfConfig {
    fn default() -> Self {
        Self {
            host: default_msf_host(),
            port: default_msf_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sploitgpt/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SPLOITGPT_OLLAMA_HOST`
    /// - `SPLOITGPT_MODEL`
    /// - `SPLOITGPT_MAX_ROUNDS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup("SPLOITGPT_OLLAMA_HOST") {
            self.ollama_host = host;
        }

        if let Some(model) = lookup("SPLOITGPT_MODEL") {
            self.model = model;
        }

        if let Some(rounds) = lookup("SPLOITGPT_MAX_ROUNDS") {
            self.agent.max_rounds = rounds.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SPLOITGPT_MAX_ROUNDS must be a positive integer, got '{rounds}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sploitgpt")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ollama_host must not be empty".into(),
            ));
        }

        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be at least 1".into(),
            ));
        }

        if self.request_timeout_secs == 0
            || self.tools.terminal_timeout_secs == 0
            || self.tools.long_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_host: default_ollama_host(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            msf: MsfConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
