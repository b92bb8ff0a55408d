// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Governance Loader
//!
//! Reads per-organization governance through [`GovernanceRepository`] and
//! writes run audit rows through [`AgentRunRepository`]. Reads and audit
//! writes degrade to "no governance" / "not persisted" on storage errors so a
//! database outage never blocks the console; toggles return the error and
//! let the caller decide.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::agent::AgentKey;
use crate::domain::governance::{AgentGovernanceRecord, AgentRunRecord, GovernanceRow, GovernanceToggle, OrganizationId};
use crate::domain::repository::{AgentRunRepository, GovernanceRepository, RepositoryError};

/// Fields of a run audit row supplied by the caller.
#[derive(Debug, Clone)]
pub struct PersistAgentRunInput {
    pub agent_key: AgentKey,
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub summary: Option<String>,
    pub guardrail_violations: Vec<String>,
}

/// Keeps the first row seen per key. Rows arrive ordered by descending
/// version, so that is the latest definition.
pub fn latest_by_key(rows: Vec<GovernanceRow>) -> HashMap<AgentKey, AgentGovernanceRecord> {
    let mut records = HashMap::new();
    for row in rows {
        records
            .entry(row.record.agent_key.clone())
            .or_insert(row.record);
    }
    records
}

pub struct GovernanceLoader {
    governance: Arc<dyn GovernanceRepository>,
    runs: Arc<dyn AgentRunRepository>,
}

impl GovernanceLoader {
    pub fn new(governance: Arc<dyn GovernanceRepository>, runs: Arc<dyn AgentRunRepository>) -> Self {
        Self { governance, runs }
    }

    pub async fn load_agent_governance(
        &self,
        organization_id: &OrganizationId,
        agent_keys: &[AgentKey],
    ) -> HashMap<AgentKey, AgentGovernanceRecord> {
        if agent_keys.is_empty() {
            return HashMap::new();
        }

        match self.governance.find_for_keys(organization_id, agent_keys).await {
            Ok(rows) => {
                let records = latest_by_key(rows);
                debug!(
                    organization_id = %organization_id,
                    governed = records.len(),
                    "Loaded agent governance"
                );
                records
            }
            Err(e) => {
                error!(
                    event = "agents:load-governance-failed",
                    organization_id = %organization_id,
                    error = %e,
                    "Failed to load agent governance"
                );
                HashMap::new()
            }
        }
    }

    /// Writes an audit row. Errors are logged, never returned.
    pub async fn persist_agent_run_record(&self, input: PersistAgentRunInput) {
        let record = AgentRunRecord {
            agent_key: input.agent_key,
            organization_id: input.organization_id,
            user_id: input.user_id,
            run_input: input.input,
            run_output: input.output,
            summary: input.summary,
            guardrail_violations: input.guardrail_violations,
            created_at: Utc::now(),
        };

        if let Err(e) = self.runs.insert(&record).await {
            error!(
                event = "agents:persist-run-failed",
                agent = %record.agent_key,
                organization_id = %record.organization_id,
                error = %e,
                "Failed to persist agent run"
            );
        }
    }

    pub async fn record_toggle(
        &self,
        organization_id: &OrganizationId,
        agent_key: &AgentKey,
        enabled: bool,
        updated_by: &str,
    ) -> Result<(), RepositoryError> {
        let toggle = GovernanceToggle {
            organization_id: organization_id.clone(),
            agent_key: agent_key.clone(),
            enabled,
            updated_by: updated_by.to_string(),
        };
        self.governance.apply_toggle(&toggle).await
    }

    pub async fn recent_runs(
        &self,
        organization_id: &OrganizationId,
        agent_key: &AgentKey,
        limit: usize,
    ) -> Result<Vec<AgentRunRecord>, RepositoryError> {
        self.runs.find_recent(organization_id, agent_key, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::{
        FailingGovernanceRepository, InMemoryAgentRunRepository, InMemoryGovernanceRepository,
    };
    use serde_json::json;

    fn row(key: &str, version: i32, lifecycle: &str) -> GovernanceRow {
        let mut record = AgentGovernanceRecord::new(key, format!("{}-v{}", key, version));
        record.lifecycle_status = lifecycle.to_string();
        GovernanceRow {
            organization_id: OrganizationId::new("org-1"),
            version,
            record,
        }
    }

    #[test]
    fn test_latest_by_key_keeps_first_row() {
        let records = latest_by_key(vec![row("a", 3, "disabled"), row("a", 2, "active"), row("b", 1, "active")]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[&AgentKey::new("a")].definition_id, "a-v3");
    }

    #[tokio::test]
    async fn test_empty_keys_skip_repository() {
        let governance = Arc::new(InMemoryGovernanceRepository::new());
        let loader = GovernanceLoader::new(governance.clone(), Arc::new(InMemoryAgentRunRepository::new()));

        let records = loader.load_agent_governance(&OrganizationId::new("org-1"), &[]).await;
        assert!(records.is_empty());
        assert_eq!(governance.query_count(), 0);
    }

    #[tokio::test]
    async fn test_load_picks_highest_version() {
        let governance = Arc::new(InMemoryGovernanceRepository::new());
        governance.insert_row(row("media-agent", 1, "active"));
        governance.insert_row(row("media-agent", 2, "disabled"));
        let loader = GovernanceLoader::new(governance.clone(), Arc::new(InMemoryAgentRunRepository::new()));

        let records = loader
            .load_agent_governance(&OrganizationId::new("org-1"), &[AgentKey::new("media-agent")])
            .await;
        let record = &records[&AgentKey::new("media-agent")];
        assert_eq!(record.definition_id, "media-agent-v2");
        assert!(!record.enabled());
        assert_eq!(governance.query_count(), 1);
    }

    #[tokio::test]
    async fn test_load_error_yields_empty_map() {
        let loader = GovernanceLoader::new(
            Arc::new(FailingGovernanceRepository),
            Arc::new(InMemoryAgentRunRepository::new()),
        );
        let records = loader
            .load_agent_governance(&OrganizationId::new("org-1"), &[AgentKey::new("a")])
            .await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let runs = Arc::new(InMemoryAgentRunRepository::new());
        let loader = GovernanceLoader::new(Arc::new(InMemoryGovernanceRepository::new()), runs.clone());
        let org = OrganizationId::new("org-1");
        let key = AgentKey::new("collections");

        loader
            .persist_agent_run_record(PersistAgentRunInput {
                agent_key: key.clone(),
                organization_id: org.clone(),
                user_id: "u1".to_string(),
                input: json!({}),
                output: json!({ "ok": true }),
                summary: Some("Dunning step 2 sent; $1.8k likely.".to_string()),
                guardrail_violations: vec![],
            })
            .await;

        let recent = loader.recent_runs(&org, &key, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_record_toggle_writes_lifecycle() {
        let governance = Arc::new(InMemoryGovernanceRepository::new());
        let loader = GovernanceLoader::new(governance.clone(), Arc::new(InMemoryAgentRunRepository::new()));
        let org = OrganizationId::new("org-1");
        let key = AgentKey::new("brief-agent");

        loader.record_toggle(&org, &key, false, "u1").await.unwrap();

        let records = loader.load_agent_governance(&org, &[key.clone()]).await;
        assert_eq!(records[&key].lifecycle_status, "disabled");
        assert!(!records[&key].enabled());
    }

    #[tokio::test]
    async fn test_record_toggle_propagates_error() {
        let loader = GovernanceLoader::new(
            Arc::new(FailingGovernanceRepository),
            Arc::new(InMemoryAgentRunRepository::new()),
        );
        let result = loader
            .record_toggle(&OrganizationId::new("org-1"), &AgentKey::new("a"), true, "u1")
            .await;
        assert!(result.is_err());
    }
}
