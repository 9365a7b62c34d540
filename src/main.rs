// Credo - Provider Credentialing Entity Store
// Copyright (c) 2025 Credo Contributors
// Licensed under the MIT License

use clap::Parser;
use credo::cli::{Cli, Commands};
use credo::config::LoggingConfig;
use credo::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console only; the store's file logging is configured in credo.toml
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let logging_config = LoggingConfig {
        local_enabled: false,
        ..Default::default()
    };
    let _guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Credo - Provider Credentialing Entity Store"
    );

    let result = match cli.command {
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            5
        }
    };

    process::exit(exit_code);
}
