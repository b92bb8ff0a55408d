// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence contracts in
//! [`crate::domain::repository`].
//!
//! ## PostgreSQL Repositories
//! - **PostgresGovernanceRepository** - `agent_definitions` with prompts and guardrails
//! - **PostgresAgentRunRepository** - `agent_runs` audit rows
//!
//! ## In-Memory Repositories
//! - **InMemoryGovernanceRepository** - versioned rows in a `Vec`, counts queries
//! - **InMemoryAgentRunRepository** - append-only run records
//!
//! `FailingGovernanceRepository` and `FailingAgentRunRepository` always
//! error and exist to exercise the degrade-on-failure paths.

pub mod postgres_agent_run;
pub mod postgres_governance;

pub use postgres_agent_run::PostgresAgentRunRepository;
pub use postgres_governance::PostgresGovernanceRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::agent::AgentKey;
use crate::domain::governance::{AgentGovernanceRecord, AgentRunRecord, GovernanceRow, GovernanceToggle, OrganizationId};
use crate::domain::repository::{AgentRunRepository, GovernanceRepository, RepositoryError};

/// `organization_id`, `user_id` and `created_by` are `uuid` columns; ids
/// are parsed before binding so a bad id fails here, not as a type error
/// inside Postgres.
pub(crate) fn parse_uuid(column: &'static str, value: &str) -> Result<uuid::Uuid, RepositoryError> {
    uuid::Uuid::parse_str(value.trim()).map_err(|_| RepositoryError::InvalidId {
        column,
        value: value.to_string(),
    })
}

#[derive(Clone, Default)]
pub struct InMemoryGovernanceRepository {
    rows: Arc<RwLock<Vec<GovernanceRow>>>,
    queries: Arc<AtomicUsize>,
}

impl InMemoryGovernanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_row(&self, row: GovernanceRow) {
        self.rows.write().push(row);
    }

    /// Stores `record` as a new highest version for the organization.
    pub fn publish(&self, organization_id: &OrganizationId, record: AgentGovernanceRecord) {
        let mut rows = self.rows.write();
        let version = next_version(&rows, organization_id, &record.agent_key);
        rows.push(GovernanceRow {
            organization_id: organization_id.clone(),
            version,
            record,
        });
    }

    /// Number of `find_for_keys` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

fn next_version(rows: &[GovernanceRow], organization_id: &OrganizationId, agent_key: &AgentKey) -> i32 {
    rows.iter()
        .filter(|row| &row.organization_id == organization_id && &row.record.agent_key == agent_key)
        .map(|row| row.version)
        .max()
        .unwrap_or(0)
        + 1
}

#[async_trait]
impl GovernanceRepository for InMemoryGovernanceRepository {
    async fn find_for_keys(
        &self,
        organization_id: &OrganizationId,
        agent_keys: &[AgentKey],
    ) -> Result<Vec<GovernanceRow>, RepositoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let mut rows: Vec<GovernanceRow> = self
            .rows
            .read()
            .iter()
            .filter(|row| &row.organization_id == organization_id && agent_keys.contains(&row.record.agent_key))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(rows)
    }

    async fn apply_toggle(&self, toggle: &GovernanceToggle) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write();
        let latest = rows
            .iter_mut()
            .filter(|row| row.organization_id == toggle.organization_id && row.record.agent_key == toggle.agent_key)
            .max_by_key(|row| row.version);

        match latest {
            Some(row) => {
                row.record.lifecycle_status = toggle.lifecycle_status().to_string();
            }
            None => {
                let mut record = AgentGovernanceRecord::new(toggle.agent_key.clone(), uuid::Uuid::new_v4().to_string());
                record.lifecycle_status = toggle.lifecycle_status().to_string();
                rows.push(GovernanceRow {
                    organization_id: toggle.organization_id.clone(),
                    version: 1,
                    record,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRunRepository {
    records: Arc<RwLock<Vec<AgentRunRecord>>>,
}

impl InMemoryAgentRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AgentRunRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl AgentRunRepository for InMemoryAgentRunRepository {
    async fn insert(&self, record: &AgentRunRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn find_recent(
        &self,
        organization_id: &OrganizationId,
        agent_key: &AgentKey,
        limit: usize,
    ) -> Result<Vec<AgentRunRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .filter(|r| &r.organization_id == organization_id && &r.agent_key == agent_key)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Governance store that is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingGovernanceRepository;

#[async_trait]
impl GovernanceRepository for FailingGovernanceRepository {
    async fn find_for_keys(&self, _: &OrganizationId, _: &[AgentKey]) -> Result<Vec<GovernanceRow>, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }

    async fn apply_toggle(&self, _: &GovernanceToggle) -> Result<(), RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
}

/// Run store that is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAgentRunRepository;

#[async_trait]
impl AgentRunRepository for FailingAgentRunRepository {
    async fn insert(&self, _: &AgentRunRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }

    async fn find_recent(
        &self,
        _: &OrganizationId,
        _: &AgentKey,
        _: usize,
    ) -> Result<Vec<AgentRunRecord>, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
}
