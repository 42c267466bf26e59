//! Model client implementations for SploitGPT.
//!
//! All providers implement the `sploitgpt_core::Provider` trait.

pub mod ollama;

pub use ollama::OllamaProvider;

use sploitgpt_config::AppConfig;
use sploitgpt_core::ProviderError;

/// Build the configured model client.
pub fn build_from_config(config: &AppConfig) -> Result<OllamaProvider, ProviderError> {
    OllamaProvider::new(
        &config.ollama_host,
        std::time::Duration::from_secs(config.request_timeout_secs),
    )
}
