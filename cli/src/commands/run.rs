// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Default command: derive the credential and hold the telemetry session

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use edge_telemetry_core::application::{CredentialService, DeviceAgent, LifecycleConfig};
use edge_telemetry_core::domain::credential::TokenExpiry;
use edge_telemetry_core::domain::device_config::DeviceConfigManifest;
use edge_telemetry_core::domain::identity::DeviceIdentity;
use edge_telemetry_core::domain::session::TelemetrySource;
use edge_telemetry_core::infrastructure::{
    HttpsTelemetryTransport, IdentityServiceClient, KeyServiceClient, SimulatedTelemetrySource,
};

use crate::shutdown;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let config = DeviceConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    let cancel = CancellationToken::new();
    shutdown::spawn_signal_listener(cancel.clone());

    // One expiry per process run.
    let expiry = TokenExpiry::after(config.token_ttl());
    info!(
        identity_socket = %config.spec.identity_service.socket_path.display(),
        key_socket = %config.spec.key_service.socket_path.display(),
        expiry = %expiry,
        "Starting edge telemetry agent"
    );

    build_agent(&config)
        .run(expiry, &cancel)
        .await
        .context("Device agent failed")?;

    info!("Edge telemetry agent stopped");
    Ok(())
}

/// Wire the production collaborators from configuration.
pub fn build_agent(config: &DeviceConfigManifest) -> DeviceAgent {
    let timeout = config.request_timeout();
    let credentials = CredentialService::new(
        Arc::new(IdentityServiceClient::new(&config.spec.identity_service, timeout)),
        Arc::new(KeyServiceClient::new(&config.spec.key_service, timeout)),
    );
    let transport = Arc::new(HttpsTelemetryTransport::new(
        config.spec.telemetry.transport_api_version.clone(),
    ));

    DeviceAgent::new(
        credentials,
        transport,
        Box::new(|identity: &DeviceIdentity| {
            Box::new(SimulatedTelemetrySource::new(identity.device_id.clone())) as Box<dyn TelemetrySource>
        }),
        LifecycleConfig {
            telemetry_interval: config.telemetry_interval(),
            close_timeout: config.close_timeout(),
        },
    )
}
