// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// Failure outcomes of a device run.
///
/// None of these are retried inside the core. `Cancelled` is a clean shutdown
/// request rather than a failure; see [`DeviceError::is_cancelled`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Key service unavailable: {0}")]
    SigningUnavailable(String),

    #[error("Credential malformed: {0}")]
    CredentialMalformed(String),

    #[error("Failed to open session: {0}")]
    SessionOpenFailed(String),

    #[error("Session failed while running: {0}")]
    SessionRunFailed(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DeviceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeviceError::Cancelled)
    }
}
