// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session
//!
//! Ports for the messaging transport and the telemetry producer, plus the
//! session lifecycle state machine driven by the connection manager.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Transport / telemetry collaborator interfaces

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::credential::ConnectionCredential;
use crate::domain::error::DeviceError;

/// Lifecycle of the single remote session.
///
/// `Opening` and `Running` may skip straight to `Closing` on cancellation or
/// an unrecoverable transport error. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Opening,
    Open,
    Running,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Opening)
                | (Opening, Open)
                | (Opening, Closing)
                | (Open, Running)
                | (Open, Closing)
                | (Running, Closing)
                | (Closing, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }
}

/// One device-to-cloud telemetry message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    pub message_id: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub body: Bytes,
}

/// Opens sessions against the remote telemetry endpoint.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Consumes the credential; it is not reused after the session opens.
    async fn open(&self, credential: ConnectionCredential) -> Result<Box<dyn TelemetrySession>, DeviceError>;
}

/// An open publish channel. Exactly one writer: the telemetry loop.
#[async_trait]
pub trait TelemetrySession: Send {
    async fn send(&mut self, message: TelemetryMessage) -> Result<(), DeviceError>;

    async fn close(&mut self) -> Result<(), DeviceError>;
}

/// Produces sample readings for the telemetry loop.
pub trait TelemetrySource: Send {
    fn next_message(&mut self) -> TelemetryMessage;
}
