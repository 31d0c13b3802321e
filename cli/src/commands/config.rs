// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use edge_telemetry_core::domain::device_config::{
    DeviceConfigManifest, CONFIG_PATH_ENV, IDENTITY_SOCKET_ENV, KEY_SOCKET_ENV,
};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write the default configuration as YAML
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./edge-telemetry.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(&output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = DeviceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./edge-telemetry.yaml");
        println!("  4. ~/.edge-telemetry/config.yaml");
        println!("  5. /etc/edge-telemetry/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Local services:".bold());
    println!(
        "  Identity: {} (api-version {})",
        spec.identity_service.socket_path.display(),
        spec.identity_service.api_version
    );
    println!(
        "  Keys:     {} (api-version {})",
        spec.key_service.socket_path.display(),
        spec.key_service.api_version
    );
    println!(
        "  {}",
        format!("overridable via {} / {}", IDENTITY_SOCKET_ENV, KEY_SOCKET_ENV).dimmed()
    );
    println!("  Request timeout: {}s", spec.request_timeout_seconds);
    println!();

    println!("{}", "Credential:".bold());
    println!("  Token TTL: {}s", spec.credential.ttl_seconds);
    println!();

    println!("{}", "Telemetry:".bold());
    println!("  Interval: {}s", spec.telemetry.interval_seconds);
    println!("  Close timeout: {}s", spec.telemetry.close_timeout_seconds);
    println!("  Transport api-version: {}", spec.telemetry.transport_api_version);

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = DeviceConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path) -> Result<()> {
    let yaml = DeviceConfigManifest::default()
        .to_yaml_string()
        .context("Failed to serialize default configuration")?;

    std::fs::write(output, yaml)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge-telemetry.yaml");

        generate(&path).await.unwrap();
        validate(Some(path.clone())).await.unwrap();

        let loaded = DeviceConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.spec.credential.ttl_seconds, 86_400);
    }

    #[tokio::test]
    async fn test_validate_rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        let mut config = DeviceConfigManifest::default();
        config.spec.telemetry.interval_seconds = 0;
        std::fs::write(&path, config.to_yaml_string().unwrap()).unwrap();

        assert!(validate(Some(path)).await.is_err());
    }

    #[tokio::test]
    async fn test_validate_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate(Some(dir.path().join("absent.yaml"))).await.is_err());
    }
}
