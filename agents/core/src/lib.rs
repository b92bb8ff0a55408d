// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! RevOS Agents Core
//!
//! Agent registry and bus, per-organization governance, and the actions
//! facade the console calls to list, run, inspect and toggle agents.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, application services, persistence adapters
//!   and the HTTP surface

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
