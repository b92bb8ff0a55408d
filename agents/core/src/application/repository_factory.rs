// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on the configured
//! storage backend. The domain layer only sees the traits.

use std::sync::Arc;

use crate::domain::repository::{AgentRunRepository, GovernanceRepository, RepositoryError, StorageBackend};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{
    InMemoryAgentRunRepository, InMemoryGovernanceRepository, PostgresAgentRunRepository,
    PostgresGovernanceRepository,
};

fn require_database<'a>(db: Option<&'a Database>) -> Result<&'a Database, RepositoryError> {
    db.ok_or_else(|| RepositoryError::Unknown("postgres storage configured but no database connection".to_string()))
}

/// Creates a GovernanceRepository implementation based on the configured backend
pub fn create_governance_repository(
    backend: &StorageBackend,
    db: Option<&Database>,
) -> Result<Arc<dyn GovernanceRepository>, RepositoryError> {
    let repository: Arc<dyn GovernanceRepository> = match backend {
        StorageBackend::InMemory => Arc::new(InMemoryGovernanceRepository::new()),
        StorageBackend::Postgres(_) => {
            Arc::new(PostgresGovernanceRepository::new(require_database(db)?.get_pool().clone()))
        }
    };
    Ok(repository)
}

/// Creates an AgentRunRepository implementation based on the configured backend
pub fn create_agent_run_repository(
    backend: &StorageBackend,
    db: Option<&Database>,
) -> Result<Arc<dyn AgentRunRepository>, RepositoryError> {
    let repository: Arc<dyn AgentRunRepository> = match backend {
        StorageBackend::InMemory => Arc::new(InMemoryAgentRunRepository::new()),
        StorageBackend::Postgres(_) => {
            Arc::new(PostgresAgentRunRepository::new(require_database(db)?.get_pool().clone()))
        }
    };
    Ok(repository)
}
