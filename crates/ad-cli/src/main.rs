mod commands;

use std::path::PathBuf;

use ad_telemetry::logging::{self, LogFormat};
use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// autodeploy -- chat with the deployment assistant and follow analysis tasks.
#[derive(Parser)]
#[command(name = "autodeploy", version, about)]
struct Cli {
    /// Backend base URL (overrides the config file).
    #[arg(long, global = true, env = "AUTODEPLOY_API_URL")]
    api: Option<String>,

    /// Config file to use instead of ~/.autodeploy/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit diagnostics as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default when no subcommand is given).
    Chat,

    /// Start a repository analysis and follow it until it finishes.
    Analyze {
        /// GitHub repository URL.
        repo_url: String,
        /// Access token that lets the backend push changes back.
        #[arg(long)]
        token: Option<String>,
    },

    /// Tail the live deployment log.
    Logs,

    /// Check whether the backend is reachable.
    Health,

    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref(), cli.api.as_deref())?;
    logging::init(
        "autodeploy",
        &config.general.log_level,
        LogFormat::from_json_flag(cli.json_logs || config.general.json_logs),
    );

    match cli.command {
        None | Some(Commands::Chat) => {
            commands::chat::run(&config).await?;
        }
        Some(Commands::Analyze { repo_url, token }) => {
            commands::analyze::run(&config, &repo_url, token.as_deref()).await?;
        }
        Some(Commands::Logs) => {
            commands::logs::run(&config).await?;
        }
        Some(Commands::Health) => {
            if !commands::health::run(&config).await? {
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            commands::config::run(&config)?;
        }
    }

    Ok(())
}
