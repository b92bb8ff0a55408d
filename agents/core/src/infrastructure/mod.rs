// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod db;
pub mod event_bus;
pub mod edge_functions;
pub mod auth;

pub use edge_functions::EdgeFunctionsClient;
pub use event_bus::EventBus;
