//! medrec CLI - Main entry point

use clap::Parser;
use medrec_cli::{AppConfig, Cli, Commands};
use medrec_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Connection settings may live in a .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("medrec".to_string())
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("medrec".to_string())
            .build()
    };

    // Environment-based settings take precedence over the verbose flag
    let log_config = if ["MEDREC_LOG_LEVEL", "MEDREC_LOG_OUTPUT", "MEDREC_LOG_FORMAT"]
        .iter()
        .any(|var| std::env::var(var).is_ok())
    {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };

    // Initialize logging (ignore errors as the CLI should work without logging)
    let _ = init_logging(&log_config);

    match execute_command(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

/// Execute the CLI command. Returns whether the run was clean; an unclean
/// run exits nonzero even though the command itself succeeded.
async fn execute_command(cli: Cli) -> medrec_cli::Result<bool> {
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Reconcile {
            dry_run,
            limit,
            folder,
            concurrency,
        } => medrec_cli::commands::reconcile::run(config, dry_run, limit, folder, concurrency).await,

        Commands::Audit { limit, examples } => {
            medrec_cli::commands::audit::run(config, limit, examples).await
        }
    }
}
