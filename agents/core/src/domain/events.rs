// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentKey;

/// Events published by the agent bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentBusEvent {
    AgentRegistered {
        key: AgentKey,
        registered_at: DateTime<Utc>,
    },
    AgentRunCompleted {
        key: AgentKey,
        summary: String,
        impact: f64,
        completed_at: DateTime<Utc>,
    },
    AgentRunFailed {
        key: AgentKey,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    AgentToggled {
        key: AgentKey,
        enabled: bool,
        toggled_at: DateTime<Utc>,
    },
}

impl AgentBusEvent {
    pub fn key(&self) -> &AgentKey {
        match self {
            AgentBusEvent::AgentRegistered { key, .. }
            | AgentBusEvent::AgentRunCompleted { key, .. }
            | AgentBusEvent::AgentRunFailed { key, .. }
            | AgentBusEvent::AgentToggled { key, .. } => key,
        }
    }
}
