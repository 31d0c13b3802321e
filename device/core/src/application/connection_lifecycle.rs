// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Connection Lifecycle Manager
//!
//! Owns the single remote session: opens it with the derived credential,
//! drives the telemetry loop until cancellation, and always attempts an
//! orderly close once a session exists.
//!
//! ```text
//! Idle → Opening → Open → Running → Closing → Closed
//!           └──────────────────┴──→ Closing   (cancel or transport error)
//! ```
//!
//! A close failure is logged and never replaces the run outcome. `Cancelled`
//! is reported as a clean `Ok(())`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Session state machine over the transport port

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::credential::ConnectionCredential;
use crate::domain::error::DeviceError;
use crate::domain::session::{DeviceTransport, SessionState, TelemetrySession, TelemetrySource};

/// Timing for the telemetry loop and the close wait
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub telemetry_interval: Duration,
    pub close_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            telemetry_interval: Duration::from_secs(1),
            close_timeout: Duration::from_secs(5),
        }
    }
}

pub struct ConnectionLifecycleManager {
    transport: Arc<dyn DeviceTransport>,
    source: Box<dyn TelemetrySource>,
    config: LifecycleConfig,
    history: Vec<SessionState>,
    messages_sent: u64,
}

impl ConnectionLifecycleManager {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        source: Box<dyn TelemetrySource>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            transport,
            source,
            config,
            history: vec![SessionState::Idle],
            messages_sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Idle)
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Open, run until `cancel` fires, then close.
    ///
    /// A manager runs once; calling `run` again after `Idle` fails with
    /// `SessionOpenFailed`.
    pub async fn run(
        &mut self,
        credential: ConnectionCredential,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceError> {
        if self.state() != SessionState::Idle {
            return Err(DeviceError::SessionOpenFailed(format!(
                "lifecycle already in state {:?}",
                self.state()
            )));
        }

        self.transition(SessionState::Opening);
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DeviceError::Cancelled),
            result = self.transport.open(credential) => result,
        };

        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                // No session exists, nothing to close
                self.transition(SessionState::Closing);
                self.transition(SessionState::Closed);
                return finish(Err(e));
            }
        };

        self.transition(SessionState::Open);
        info!("Telemetry session opened");

        self.transition(SessionState::Running);
        let run_result = self.telemetry_loop(session.as_mut(), cancel).await;
        match &run_result {
            Err(DeviceError::Cancelled) => info!(sent = self.messages_sent, "Cancellation received, closing session"),
            Err(e) => error!(sent = self.messages_sent, "Telemetry loop failed: {}", e),
            Ok(()) => {}
        }

        self.transition(SessionState::Closing);
        self.close_session(session.as_mut()).await;
        self.transition(SessionState::Closed);

        finish(run_result)
    }

    async fn telemetry_loop(
        &mut self,
        session: &mut dyn TelemetrySession,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceError> {
        let mut tick = interval(self.config.telemetry_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeviceError::Cancelled),
                _ = tick.tick() => {}
            }

            let message = self.source.next_message();
            let message_id = message.message_id.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeviceError::Cancelled),
                result = session.send(message) => result?,
            }

            self.messages_sent += 1;
            debug!(message_id = %message_id, sent = self.messages_sent, "Telemetry message sent");
        }
    }

    async fn close_session(&self, session: &mut dyn TelemetrySession) {
        match tokio::time::timeout(self.config.close_timeout, session.close()).await {
            Ok(Ok(())) => info!("Telemetry session closed"),
            Ok(Err(e)) => warn!("Session close failed: {}", e),
            Err(_) => warn!(timeout = ?self.config.close_timeout, "Session close timed out"),
        }
    }

    fn transition(&mut self, next: SessionState) {
        let current = self.state();
        if !current.can_transition_to(next) {
            warn!(from = ?current, to = ?next, "Unexpected session state transition");
        }
        debug!(from = ?current, to = ?next, "Session state transition");
        self.history.push(next);
    }
}

/// Cancellation is a clean shutdown, not a failure.
fn finish(result: Result<(), DeviceError>) -> Result<(), DeviceError> {
    match result {
        Err(DeviceError::Cancelled) => Ok(()),
        other => other,
    }
}
