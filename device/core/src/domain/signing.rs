// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Signing port
//
// The key custody daemon holds the key; this side only ever names it by
// handle. Implementations live in infrastructure/key_client.rs.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::credential::{SignablePayload, Signature};
use crate::domain::error::DeviceError;
use crate::domain::identity::DeviceIdentity;

/// Algorithm name sent with every signing request.
pub const SIGNING_ALGORITHM: &str = "HMAC-SHA256";

#[async_trait]
pub trait KeySigner: Send + Sync {
    /// Sign `payload.encoded_message` with the key named by `identity.key_handle`.
    async fn sign(
        &self,
        identity: &DeviceIdentity,
        payload: &SignablePayload,
        cancel: &CancellationToken,
    ) -> Result<Signature, DeviceError>;
}
