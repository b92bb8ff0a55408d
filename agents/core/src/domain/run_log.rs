// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Run Log
//!
//! Bounded, newest-first history of agent runs kept by the bus. The log is a
//! recent-activity cache: the persisted `agent_runs` table remains the source
//! of truth, so once `capacity` entries are held the oldest entry is evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::agent::{AgentKey, AgentRunInput, AgentRunOutput};

pub const DEFAULT_LOG_CAPACITY: usize = 1000;
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Result recorded for one run attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { output: AgentRunOutput },
    Failed { reason: String },
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }

    pub fn output(&self) -> Option<&AgentRunOutput> {
        match self {
            RunOutcome::Completed { output } => Some(output),
            RunOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub ts: DateTime<Utc>,
    pub key: AgentKey,
    pub input: AgentRunInput,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone)]
pub struct RunLog {
    entries: VecDeque<RunLogEntry>,
    capacity: usize,
}

impl RunLog {
    /// A zero capacity is treated as one so the latest run is always visible.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Prepends an entry, evicting the oldest when full.
    pub fn record(&mut self, entry: RunLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Most recent `limit` entries for `key`, newest first.
    pub fn for_key(&self, key: &AgentKey, limit: usize) -> Vec<RunLogEntry> {
        self.entries
            .iter()
            .filter(|entry| &entry.key == key)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
