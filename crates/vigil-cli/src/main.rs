//! Vigil CLI - Main entry point

use clap::Parser;
use std::process;
use tracing::error;
use vigil_cli::{Cli, Commands};
use vigil_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Verbose mode logs debug to console; otherwise only warnings
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("vigil-cli".to_string())
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("vigil-cli".to_string())
            .build()
    };

    // Environment variables take precedence over the flag-derived
    // defaults; unset variables leave them alone
    let log_config = log_config.clone().with_env_overrides().unwrap_or(log_config);

    // The CLI still works without logging
    let _ = init_logging(&log_config);

    let result = execute_command(cli).await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> vigil_cli::Result<()> {
    match cli.command {
        Commands::Export { output, days, from, to } => {
            vigil_cli::commands::export::run(cli.db_path, output, days, from, to).await
        },

        Commands::Verify { file } => vigil_cli::commands::verify::run(file).await,

        Commands::List { limit, event_type, user } => {
            vigil_cli::commands::list::run(cli.db_path, limit, event_type, user).await
        },

        Commands::Purge { retention_days } => {
            vigil_cli::commands::purge::run(cli.db_path, retention_days).await
        },
    }
}
