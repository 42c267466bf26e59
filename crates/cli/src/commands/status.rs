//! `sploitgpt status`: show configuration and check the model server.

use sploitgpt_config::AppConfig;
use sploitgpt_core::provider::Provider;

use super::boot;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("SploitGPT Status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Ollama:       {}", config.ollama_host);
    println!("  Model:        {}", config.model);
    println!("  Max rounds:   {}", config.agent.max_rounds);
    println!("  Loot dir:     {}", config.tools.loot_dir.display());
    println!("  Tools:        {}", config.tools.advertised.join(", "));
    println!("  Metasploit:   {}:{}", config.msf.host, config.msf.port);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults (run `sploitgpt init`)");
    }

    let provider = sploitgpt_providers::build_from_config(&config)?;
    let context = boot::gather(&config, &provider).await;

    if context.model_connected {
        println!("  ✅ Ollama reachable");
        match provider.list_models().await {
            Ok(models) if models.iter().any(|m| m == &config.model) => {
                println!("  ✅ Model {} installed", config.model);
            }
            Ok(models) => {
                println!("  ⚠️  Model {} not installed (run `ollama pull {}`)", config.model, config.model);
                if !models.is_empty() {
                    println!("     Installed: {}", models.join(", "));
                }
            }
            Err(e) => println!("  ⚠️  Could not list models: {e}"),
        }
    } else {
        println!("  ❌ Ollama not reachable at {}", config.ollama_host);
    }

    if context.msf_connected {
        println!("  ✅ Metasploit RPC reachable");
    } else {
        println!("  ⚠️  Metasploit RPC not reachable");
    }

    println!(
        "  Security tools: {}/{} on PATH",
        context.available_tools.len(),
        boot::SECURITY_TOOLS.len()
    );
    if !context.missing_tools.is_empty() {
        println!("     Missing: {}", context.missing_tools.join(", "));
    }

    Ok(())
}
