// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Edge telemetry device core
//!
//! Derives a delegated shared-access credential from the local identity and
//! key custody daemons, then holds a single telemetry session open until the
//! process is cancelled.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Exposes the domain, application and infrastructure layers

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
