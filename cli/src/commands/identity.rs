// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resolve and print the device identity without signing anything

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use edge_telemetry_core::domain::device_config::DeviceConfigManifest;
use edge_telemetry_core::domain::identity::IdentityProvider;
use edge_telemetry_core::infrastructure::IdentityServiceClient;

use crate::shutdown;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let config = DeviceConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    let cancel = CancellationToken::new();
    shutdown::spawn_signal_listener(cancel.clone());

    let provider = IdentityServiceClient::new(&config.spec.identity_service, config.request_timeout());
    let identity = provider
        .resolve_identity(&cancel)
        .await
        .context("Failed to resolve device identity")?;

    println!("{}", "Device Identity:".bold());
    println!("  Device ID: {}", identity.device_id);
    println!("  Hub: {}", identity.hub_endpoint);
    if identity.uses_gateway() {
        println!("  Gateway: {}", identity.gateway_endpoint);
    } else {
        println!("  Gateway: {}", "(direct to hub)".dimmed());
    }
    println!("  Key handle: {}", identity.key_handle.dimmed());

    Ok(())
}
