// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod catalog;
pub mod bus;
pub mod governance;
pub mod actions;
pub mod repository_factory;

pub use actions::{ActionError, AgentActions, AgentRunResult, AgentView};
pub use bus::{AgentBus, AgentListing, BusError};
pub use catalog::builtin_agents;
pub use governance::{GovernanceLoader, PersistAgentRunInput};
pub use registry::{AgentHandler, RegisteredAgent};
