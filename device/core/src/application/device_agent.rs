// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Device Agent
//
// One process run: derive the credential, then hand it to the lifecycle
// manager. Failures before the session opens leave no remote side effects.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::connection_lifecycle::{ConnectionLifecycleManager, LifecycleConfig};
use crate::application::credential_service::CredentialService;
use crate::domain::credential::TokenExpiry;
use crate::domain::error::DeviceError;
use crate::domain::identity::DeviceIdentity;
use crate::domain::session::{DeviceTransport, TelemetrySource};

/// Builds the telemetry producer once the device identity is known.
pub type TelemetrySourceFactory = Box<dyn Fn(&DeviceIdentity) -> Box<dyn TelemetrySource> + Send + Sync>;

pub struct DeviceAgent {
    credentials: CredentialService,
    transport: Arc<dyn DeviceTransport>,
    source_factory: TelemetrySourceFactory,
    lifecycle: LifecycleConfig,
}

impl DeviceAgent {
    pub fn new(
        credentials: CredentialService,
        transport: Arc<dyn DeviceTransport>,
        source_factory: TelemetrySourceFactory,
        lifecycle: LifecycleConfig,
    ) -> Self {
        Self {
            credentials,
            transport,
            source_factory,
            lifecycle,
        }
    }

    /// Run until `cancel` fires. Returns `Ok(())` on clean shutdown,
    /// including a cancellation observed before the session opened.
    pub async fn run(&self, expiry: TokenExpiry, cancel: &CancellationToken) -> Result<(), DeviceError> {
        let derived = match self.credentials.derive_credential(expiry, cancel).await {
            Ok(derived) => derived,
            Err(DeviceError::Cancelled) => {
                info!("Cancelled before the session was opened");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let source = (self.source_factory)(&derived.identity);
        let mut manager = ConnectionLifecycleManager::new(self.transport.clone(), source, self.lifecycle.clone());
        manager.run(derived.credential, cancel).await?;

        info!(sent = manager.messages_sent(), "Device agent stopped");
        Ok(())
    }
}
