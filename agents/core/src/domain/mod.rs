// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Agent metadata and status, governance records, run history, the TRS
//! scoring model and the ports implemented by infrastructure.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and repository/remote contracts

pub mod agent;
pub mod auth;
pub mod config;
pub mod events;
pub mod governance;
pub mod remote;
pub mod repository;
pub mod run_log;
pub mod scoring;
