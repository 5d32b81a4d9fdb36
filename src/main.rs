// LMS Toolkit - LMS extraction and relational loading
// Copyright (c) 2025 LMS Toolkit Contributors
// Licensed under the MIT License

use clap::Parser;
use lms_toolkit::cli::commands::common::{EXIT_CONFIGURATION, EXIT_FATAL, FATAL_MESSAGE};
use lms_toolkit::cli::{Cli, Commands};
use lms_toolkit::config::{load_config_or_default, ToolkitConfig};
use lms_toolkit::logging::init_logging;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config_or_default(cli.config.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(EXIT_CONFIGURATION);
        }
    };

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.application.log_level);
    let guard = match init_logging(log_level, &config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_CONFIGURATION);
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "LMS Toolkit");

    let exit_code = match execute_command(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("{FATAL_MESSAGE}");
            EXIT_FATAL
        }
    };

    // process::exit skips destructors; flush the file appender first
    drop(guard);
    process::exit(exit_code);
}

async fn execute_command(cli: &Cli, config: &ToolkitConfig) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Canvas(args) => args.execute(config).await,
        Commands::Schoology(args) => args.execute(config).await,
        Commands::Google(args) => args.execute(config).await,
        Commands::Load(args) => args.execute(config).await,
        Commands::Migrate(args) => args.execute(config).await,
    }
}
