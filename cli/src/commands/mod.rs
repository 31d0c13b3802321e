// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the edge telemetry CLI

pub mod config;
pub mod identity;
pub mod run;

pub use self::config::ConfigCommand;
