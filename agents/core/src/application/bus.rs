// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Bus
//!
//! Per-process service object owning the registered agents, their mutable
//! [`AgentStatus`] and the bounded [`RunLog`]. One instance is built at
//! startup and shared as `Arc<AgentBus>`; two processes never see each
//! other's status or logs.
//!
//! Locks are `parking_lot` and are only taken for short, synchronous
//! sections. A run clones the handler out of the registry, releases the lock,
//! awaits the handler and then takes the write locks to record the outcome.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::application::registry::RegisteredAgent;
use crate::domain::agent::{lifecycle_label, AgentKey, AgentMeta, AgentRunInput, AgentRunOutput, AgentStatus};
use crate::domain::config::BusConfig;
use crate::domain::events::AgentBusEvent;
use crate::domain::run_log::{RunLog, RunLogEntry, RunOutcome, DEFAULT_LOG_CAPACITY, DEFAULT_LOG_LIMIT};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentKey),

    #[error("Agent {key} failed: {reason}")]
    AgentFailed { key: AgentKey, reason: String },
}

/// One row of [`AgentBus::list_agents`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentListing {
    pub meta: AgentMeta,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_payload: Option<serde_json::Value>,
}

#[derive(Default)]
struct Registry {
    order: Vec<AgentKey>,
    agents: HashMap<AgentKey, RegisteredAgent>,
    statuses: HashMap<AgentKey, AgentStatus>,
}

pub struct AgentBus {
    registry: RwLock<Registry>,
    log: RwLock<RunLog>,
    default_log_limit: usize,
    events: Option<EventBus>,
}

impl AgentBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            log: RwLock::new(RunLog::new(log_capacity)),
            default_log_limit: DEFAULT_LOG_LIMIT,
            events: None,
        }
    }

    pub fn from_config(config: &BusConfig) -> Self {
        Self::new(config.log_capacity).with_default_log_limit(config.default_log_limit)
    }

    pub fn with_default_log_limit(mut self, limit: usize) -> Self {
        self.default_log_limit = limit.max(1);
        self
    }

    /// Publish run and toggle events to `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn default_log_limit(&self) -> usize {
        self.default_log_limit
    }

    /// Inserts or replaces the agent under its key. An existing status is
    /// kept; a new key starts enabled and `active`.
    pub fn register(&self, agent: RegisteredAgent) {
        let key = agent.key().clone();
        {
            let mut registry = self.registry.write();
            if !registry.agents.contains_key(&key) {
                registry.order.push(key.clone());
            }
            if !registry.statuses.contains_key(&key) {
                let status = AgentStatus::initial(&agent.meta);
                registry.statuses.insert(key.clone(), status);
            }
            registry.agents.insert(key.clone(), agent);
        }

        debug!(agent = %key, "Registered agent");
        self.publish(AgentBusEvent::AgentRegistered {
            key,
            registered_at: Utc::now(),
        });
    }

    pub fn register_all(&self, agents: impl IntoIterator<Item = RegisteredAgent>) {
        for agent in agents {
            self.register(agent);
        }
    }

    /// Agents in registration order with a snapshot of their status.
    pub fn list_agents(&self) -> Vec<AgentListing> {
        let registry = self.registry.read();
        registry
            .order
            .iter()
            .filter_map(|key| {
                let agent = registry.agents.get(key)?;
                let status = registry
                    .statuses
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| AgentStatus::initial(&agent.meta));
                Some(AgentListing {
                    meta: agent.meta.clone(),
                    status,
                    sample_payload: agent.sample_payload.clone(),
                })
            })
            .collect()
    }

    pub fn get_agent(&self, key: &AgentKey) -> Result<RegisteredAgent, BusError> {
        self.registry
            .read()
            .agents
            .get(key)
            .cloned()
            .ok_or_else(|| BusError::UnknownAgent(key.clone()))
    }

    pub fn contains(&self, key: &AgentKey) -> bool {
        self.registry.read().agents.contains_key(key)
    }

    pub fn status(&self, key: &AgentKey) -> Option<AgentStatus> {
        self.registry.read().statuses.get(key).cloned()
    }

    /// Runs the handler and records the outcome. A handler error becomes a
    /// failed log entry and `last_summary = "Failed: <reason>"` before it is
    /// returned as [`BusError::AgentFailed`].
    pub async fn run_agent(&self, key: &AgentKey, input: AgentRunInput) -> Result<AgentRunOutput, BusError> {
        let agent = self.get_agent(key)?;

        let result = agent.handler.run(input.clone()).await;
        let ts = Utc::now();

        match result {
            Ok(output) => {
                let summary = output.status_summary();
                let contribution = output.impact_contribution();

                self.log.write().record(RunLogEntry {
                    ts,
                    key: key.clone(),
                    input,
                    outcome: RunOutcome::Completed { output: output.clone() },
                });
                if let Some(status) = self.registry.write().statuses.get_mut(key) {
                    status.last_run = Some(ts);
                    status.last_summary = Some(summary.clone());
                    status.impact += contribution;
                }

                info!(agent = %key, impact = contribution, "Agent run completed: {}", summary);
                self.publish(AgentBusEvent::AgentRunCompleted {
                    key: key.clone(),
                    summary,
                    impact: contribution,
                    completed_at: ts,
                });
                Ok(output)
            }
            Err(e) => {
                let reason = format!("{:#}", e);

                self.log.write().record(RunLogEntry {
                    ts,
                    key: key.clone(),
                    input,
                    outcome: RunOutcome::Failed { reason: reason.clone() },
                });
                if let Some(status) = self.registry.write().statuses.get_mut(key) {
                    status.last_run = Some(ts);
                    status.last_summary = Some(format!("Failed: {}", reason));
                }

                warn!(agent = %key, "Agent run failed: {}", reason);
                self.publish(AgentBusEvent::AgentRunFailed {
                    key: key.clone(),
                    reason: reason.clone(),
                    failed_at: ts,
                });
                Err(BusError::AgentFailed { key: key.clone(), reason })
            }
        }
    }

    /// Newest-first log entries for `key`; `None` uses the default limit.
    pub fn logs_for(&self, key: &AgentKey, limit: Option<usize>) -> Vec<RunLogEntry> {
        let limit = limit.unwrap_or(self.default_log_limit);
        self.log.read().for_key(key, limit)
    }

    /// Flips `enabled` and the lifecycle label; nothing else changes.
    pub fn set_enabled(&self, key: &AgentKey, enabled: bool) -> Result<AgentStatus, BusError> {
        let snapshot = {
            let mut registry = self.registry.write();
            let status = registry
                .statuses
                .get_mut(key)
                .ok_or_else(|| BusError::UnknownAgent(key.clone()))?;
            status.set_enabled(enabled);
            status.clone()
        };

        info!(agent = %key, lifecycle = lifecycle_label(enabled), "Agent toggled");
        self.publish(AgentBusEvent::AgentToggled {
            key: key.clone(),
            enabled,
            toggled_at: Utc::now(),
        });
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.registry.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, event: AgentBusEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl Default for AgentBus {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl std::fmt::Debug for AgentBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBus")
            .field("agents", &self.len())
            .field("log_entries", &self.log.read().len())
            .field("default_log_limit", &self.default_log_limit)
            .finish()
    }
}
