//! SploitGPT CLI, the main entry point.
//!
//! Commands:
//! - `init`:   Write a default config and create the loot directory
//! - `agent`:  Interactive session or single-instruction mode
//! - `status`: Show config and check the model server

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sploitgpt",
    about = "SploitGPT: autonomous penetration testing agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ~/.sploitgpt/config.toml and create the loot directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the agent
    Agent {
        /// Send a single instruction instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show configuration and model server status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Agent { message } => commands::agent::run(message).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
