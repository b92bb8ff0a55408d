// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod api;

pub use api::{router, AppState};
