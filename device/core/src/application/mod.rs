// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod credential_service;
pub mod connection_lifecycle;
pub mod device_agent;

pub use connection_lifecycle::{ConnectionLifecycleManager, LifecycleConfig};
pub use credential_service::{CredentialService, DerivedCredential};
pub use device_agent::{DeviceAgent, TelemetrySourceFactory};
