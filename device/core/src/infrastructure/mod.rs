// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod local_socket;
pub mod identity_client;
pub mod key_client;
pub mod https_transport;
pub mod telemetry;

pub use https_transport::HttpsTelemetryTransport;
pub use identity_client::IdentityServiceClient;
pub use key_client::KeyServiceClient;
pub use telemetry::SimulatedTelemetrySource;
