// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the RevOS CLI

pub mod agents;
pub mod config;
pub mod serve;

pub use self::agents::AgentsCommand;
pub use self::config::ConfigCommand;
