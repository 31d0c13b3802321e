// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credential Service
//!
//! Runs the derivation pipeline strictly in order:
//! identity → signable payload → signature → credential.
//! Signing never starts before identity resolution completes, and the
//! assembler is never reached when signing fails. The cancel signal is
//! checked before every stage so a triggered signal issues no further
//! requests.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates the identity and key custody ports

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::credential::{assemble_credential, build_signable_payload, ConnectionCredential, TokenExpiry};
use crate::domain::error::DeviceError;
use crate::domain::identity::{DeviceIdentity, IdentityProvider};
use crate::domain::signing::KeySigner;

/// Output of a successful derivation.
#[derive(Debug, Clone)]
pub struct DerivedCredential {
    pub identity: DeviceIdentity,
    pub credential: ConnectionCredential,
}

pub struct CredentialService {
    identity_provider: Arc<dyn IdentityProvider>,
    signer: Arc<dyn KeySigner>,
}

impl CredentialService {
    pub fn new(identity_provider: Arc<dyn IdentityProvider>, signer: Arc<dyn KeySigner>) -> Self {
        Self {
            identity_provider,
            signer,
        }
    }

    /// Derive the connection credential for `expiry`.
    ///
    /// `expiry` must be the single per-process value; it is embedded in both
    /// the signed payload and the emitted credential.
    pub async fn derive_credential(
        &self,
        expiry: TokenExpiry,
        cancel: &CancellationToken,
    ) -> Result<DerivedCredential, DeviceError> {
        ensure_active(cancel)?;
        let identity = self.identity_provider.resolve_identity(cancel).await?;

        ensure_active(cancel)?;
        let payload = build_signable_payload(&identity, expiry);
        debug!(resource_uri = %payload.resource_uri, expiry = %payload.expiry, "Built signable payload");

        let signature = self.signer.sign(&identity, &payload, cancel).await?;

        ensure_active(cancel)?;
        let credential = assemble_credential(&identity, &signature, &payload)?;
        info!(
            device_id = %identity.device_id,
            expiry = %credential.expiry(),
            via_gateway = identity.uses_gateway(),
            "Derived connection credential"
        );

        Ok(DerivedCredential { identity, credential })
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), DeviceError> {
    if cancel.is_cancelled() {
        Err(DeviceError::Cancelled)
    } else {
        Ok(())
    }
}
