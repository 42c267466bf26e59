//! `sploitgpt init`: write the default config and create the loot directory.

use sploitgpt_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    std::fs::create_dir_all(&config_dir)?;

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Use --force to overwrite it.");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  ✅ Wrote {}", config_path.display());
    }

    let config = AppConfig::load_from(&config_path)?;
    match std::fs::create_dir_all(&config.tools.loot_dir) {
        Ok(()) => println!("  ✅ Loot directory: {}", config.tools.loot_dir.display()),
        Err(e) => println!(
            "  ⚠️  Could not create loot directory {}: {e}",
            config.tools.loot_dir.display()
        ),
    }

    println!();
    println!("  Next: pull the model with `ollama pull {}`", config.model);
    println!("  then run `sploitgpt agent`.");
    Ok(())
}
