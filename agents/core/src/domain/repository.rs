// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for organization-scoped agent state. Interfaces are
//! defined here and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Tables | Implementations |
//! |-------|--------|----------------|
//! | `GovernanceRepository` | `agent_definitions`, `agent_prompts`, `agent_guardrails` | `InMemoryGovernanceRepository`, `PostgresGovernanceRepository` |
//! | `AgentRunRepository` | `agent_runs` | `InMemoryAgentRunRepository`, `PostgresAgentRunRepository` |
//!
//! Concrete implementations are selected at startup from the `storage`
//! section of `revos-config.yaml`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentKey;
use crate::domain::governance::{AgentRunRecord, GovernanceRow, GovernanceToggle, OrganizationId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub connection_string: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[async_trait]
pub trait GovernanceRepository: Send + Sync {
    /// Governance rows of `organization_id` for the given keys, ordered by
    /// descending version.
    async fn find_for_keys(
        &self,
        organization_id: &OrganizationId,
        agent_keys: &[AgentKey],
    ) -> Result<Vec<GovernanceRow>, RepositoryError>;

    /// Applies a lifecycle toggle to the latest definition row of the agent,
    /// inserting a new definition when none exists.
    async fn apply_toggle(&self, toggle: &GovernanceToggle) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AgentRunRepository: Send + Sync {
    async fn insert(&self, record: &AgentRunRecord) -> Result<(), RepositoryError>;

    /// Most recent records for one agent in one organization, newest first.
    async fn find_recent(
        &self,
        organization_id: &OrganizationId,
        agent_key: &AgentKey,
        limit: usize,
    ) -> Result<Vec<AgentRunRecord>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid {column}: '{value}' is not a UUID")]
    InvalidId { column: &'static str, value: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
