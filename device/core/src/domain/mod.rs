// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and ports for the credential pipeline and session lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity, credential, signing and session vocabulary

pub mod error;
pub mod identity;
pub mod credential;
pub mod signing;
pub mod session;
pub mod device_config;

pub use error::DeviceError;
