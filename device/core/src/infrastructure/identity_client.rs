// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Identity Service Client
//
// Anti-Corruption Layer over the local identity custody daemon. Issues a single
// `GET /identities/identity` per call and maps the response envelope onto the
// domain DeviceIdentity. Nothing is cached between calls.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::device_config::LocalServiceConfig;
use crate::domain::error::DeviceError;
use crate::domain::identity::{DeviceIdentity, IdentityProvider};
use crate::infrastructure::local_socket::{LocalSocketClient, LocalSocketError};
use std::time::Duration;

pub struct IdentityServiceClient {
    client: LocalSocketClient,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    spec: IdentitySpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentitySpec {
    hub_name: String,
    #[serde(default)]
    gateway_host: Option<String>,
    device_id: String,
    auth: AuthSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSpec {
    #[serde(rename = "type")]
    auth_type: String,
    #[serde(default)]
    key_handle: Option<String>,
}

impl IdentityServiceClient {
    pub fn new(config: &LocalServiceConfig, timeout: Duration) -> Self {
        Self {
            client: LocalSocketClient::new(&config.socket_path, timeout),
            api_version: config.api_version.clone(),
        }
    }

    fn request_path(&self) -> String {
        format!("/identities/identity?api-version={}", self.api_version)
    }
}

fn identity_from_envelope(envelope: IdentityEnvelope) -> Result<DeviceIdentity, DeviceError> {
    let spec = envelope.spec;

    if spec.auth.auth_type != "sas" {
        return Err(DeviceError::IdentityUnavailable(format!(
            "unsupported authentication type '{}'",
            spec.auth.auth_type
        )));
    }
    let key_handle = spec
        .auth
        .key_handle
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DeviceError::IdentityUnavailable("identity has no key handle".to_string()))?;
    if spec.device_id.is_empty() {
        return Err(DeviceError::IdentityUnavailable("identity has no device id".to_string()));
    }
    if spec.hub_name.is_empty() {
        return Err(DeviceError::IdentityUnavailable("identity has no hub name".to_string()));
    }

    let gateway_endpoint = spec
        .gateway_host
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| spec.hub_name.clone());

    Ok(DeviceIdentity {
        device_id: spec.device_id,
        hub_endpoint: spec.hub_name,
        gateway_endpoint,
        key_handle,
    })
}

fn map_socket_error(err: LocalSocketError) -> DeviceError {
    match err {
        LocalSocketError::Cancelled => DeviceError::Cancelled,
        other => DeviceError::IdentityUnavailable(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for IdentityServiceClient {
    async fn resolve_identity(&self, cancel: &CancellationToken) -> Result<DeviceIdentity, DeviceError> {
        debug!(socket = ?self.client.socket_path(), "Requesting device identity");

        let response = self
            .client
            .get(&self.request_path(), cancel)
            .await
            .map_err(map_socket_error)?;

        if !response.is_success() {
            return Err(DeviceError::IdentityUnavailable(format!(
                "HTTP {}: {}",
                response.status,
                response.text()
            )));
        }

        let envelope: IdentityEnvelope = response
            .json()
            .map_err(|e| DeviceError::IdentityUnavailable(format!("Failed to parse identity response: {}", e)))?;

        let identity = identity_from_envelope(envelope)?;
        info!(
            device_id = %identity.device_id,
            hub = %identity.hub_endpoint,
            gateway = %identity.gateway_endpoint,
            "Resolved device identity"
        );
        Ok(identity)
    }
}
