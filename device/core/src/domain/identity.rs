// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Device identity
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity record and the port used to resolve it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::error::DeviceError;

/// Identity record for this device as held by the identity custody daemon.
///
/// `key_handle` names a key inside the key custody daemon. It is a capability
/// reference, not key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub hub_endpoint: String,
    pub gateway_endpoint: String,
    pub key_handle: String,
}

impl DeviceIdentity {
    /// True when traffic goes through a gateway rather than straight to the hub.
    pub fn uses_gateway(&self) -> bool {
        self.gateway_endpoint != self.hub_endpoint
    }
}

/// Port over the identity custody daemon.
///
/// Implementations resolve fresh on every call and never cache.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_identity(&self, cancel: &CancellationToken) -> Result<DeviceIdentity, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(hub: &str, gateway: &str) -> DeviceIdentity {
        DeviceIdentity {
            device_id: "sensor-1".to_string(),
            hub_endpoint: hub.to_string(),
            gateway_endpoint: gateway.to_string(),
            key_handle: "k1".to_string(),
        }
    }

    #[test]
    fn test_uses_gateway() {
        assert!(!identity("hub.example.net", "hub.example.net").uses_gateway());
        assert!(identity("hub.example.net", "edge.local").uses_gateway());
    }
}
