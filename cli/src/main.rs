// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Edge Telemetry Agent
//!
//! The `edge-telemetry` binary runs on an edge device whose secret key is held
//! by a local key-custody daemon. It derives a time-limited SAS connection
//! credential through the local identity and key services, then holds one
//! telemetry session to the hub until SIGINT or SIGTERM.
//!
//! ## Commands
//!
//! - `edge-telemetry [run]` - Derive the credential and send telemetry (default)
//! - `edge-telemetry identity` - Resolve and print the device identity
//! - `edge-telemetry config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use edge_telemetry::commands::{self, ConfigCommand};
use edge_telemetry_core::domain::device_config::CONFIG_PATH_ENV;

/// Edge Telemetry Agent - delegated device credentials and telemetry
#[derive(Parser)]
#[command(name = "edge-telemetry")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "EDGE_TELEMETRY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the connection credential and send telemetry until shutdown
    #[command(name = "run")]
    Run,

    /// Resolve and print the device identity (no signing)
    #[command(name = "identity")]
    Identity,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::execute(cli.config).await,
        Commands::Identity => commands::identity::execute(cli.config).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default_command() {
        let cli = Cli::try_parse_from(["edge-telemetry"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "edge-telemetry",
            "identity",
            "--config",
            "/tmp/device.yaml",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Identity)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/device.yaml")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_validate_takes_file() {
        let cli = Cli::try_parse_from(["edge-telemetry", "config", "validate", "device.yaml"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                command: ConfigCommand::Validate { file },
            }) => assert_eq!(file, Some(PathBuf::from("device.yaml"))),
            _ => panic!("expected config validate"),
        }
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(Cli::try_parse_from(["edge-telemetry", "--log-format", "xml"]).is_err());
    }
}
