// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Governance
//!
//! Organization-scoped overrides of an agent's lifecycle, together with the
//! prompts and guardrails an administrator attached to it. Records are
//! persisted in `agent_definitions`, `agent_prompts` and `agent_guardrails`
//! and are read-only from the bus's point of view.
//!
//! [`merge`] is the single place where governance is applied to the bus's
//! in-memory status: whenever a record is present its lifecycle decides
//! `enabled`, regardless of any local toggle.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{lifecycle_enables, lifecycle_label, AgentKey, AgentStatus, LIFECYCLE_ACTIVE};
use chrono::{DateTime, Utc};

pub const DEFAULT_GUARDRAIL_SEVERITY: &str = "medium";

/// Tenant identifier (`organization_id` in the persisted schema).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPrompt {
    pub id: String,
    pub name: String,
    pub role: String,
    pub content: String,
    pub lifecycle_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGuardrail {
    pub id: String,
    pub rule: String,
    pub severity: String,
    #[serde(default)]
    pub remediation: Option<String>,
    pub lifecycle_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGovernanceRecord {
    pub agent_key: AgentKey,
    pub definition_id: String,
    pub lifecycle_status: String,
    pub auto_runnable: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: Option<serde_json::Value>,
    #[serde(default)]
    pub prompts: Vec<AgentPrompt>,
    #[serde(default)]
    pub guardrails: Vec<AgentGuardrail>,
}

impl AgentGovernanceRecord {
    /// Minimal record with an active lifecycle and no prompts or guardrails.
    pub fn new(agent_key: impl Into<AgentKey>, definition_id: impl Into<String>) -> Self {
        Self {
            agent_key: agent_key.into(),
            definition_id: definition_id.into(),
            lifecycle_status: LIFECYCLE_ACTIVE.to_string(),
            auto_runnable: false,
            display_name: None,
            description: None,
            definition: None,
            prompts: Vec::new(),
            guardrails: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        lifecycle_enables(&self.lifecycle_status)
    }
}

/// A governance row as stored, before folding by version.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernanceRow {
    pub organization_id: OrganizationId,
    pub version: i32,
    pub record: AgentGovernanceRecord,
}

/// Lifecycle change written when an operator toggles an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernanceToggle {
    pub organization_id: OrganizationId,
    pub agent_key: AgentKey,
    pub enabled: bool,
    pub updated_by: String,
}

impl GovernanceToggle {
    /// Lifecycle label persisted for this toggle.
    pub fn lifecycle_status(&self) -> &'static str {
        lifecycle_label(self.enabled)
    }
}

/// Audit row for one local run, written to `agent_runs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunRecord {
    pub agent_key: AgentKey,
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub run_input: serde_json::Value,
    pub run_output: serde_json::Value,
    pub summary: Option<String>,
    pub guardrail_violations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Status as shown to a tenant: bus status with governance applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveAgentStatus {
    #[serde(flatten)]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<AgentGovernanceRecord>,
}

impl EffectiveAgentStatus {
    pub fn enabled(&self) -> bool {
        self.status.enabled
    }

    pub fn is_governed(&self) -> bool {
        self.governance.is_some()
    }
}

/// Applies a governance record (if any) onto a bus status.
pub fn merge(base: &AgentStatus, governance: Option<&AgentGovernanceRecord>) -> EffectiveAgentStatus {
    let mut status = base.clone();
    if let Some(record) = governance {
        status.enabled = record.enabled();
        status.lifecycle = record.lifecycle_status.clone();
        status.auto_runnable = record.auto_runnable;
    }
    EffectiveAgentStatus {
        status,
        governance: governance.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{AgentCategory, AgentMeta};

    fn base() -> AgentStatus {
        let meta = AgentMeta::new("media-agent", "Media Agent", AgentCategory::Content, "d").auto_runnable();
        let mut status = AgentStatus::initial(&meta);
        status.impact = 8000.0;
        status.last_summary = Some("ran".into());
        status
    }

    #[test]
    fn test_merge_without_governance_keeps_base() {
        let status = base();
        let merged = merge(&status, None);
        assert_eq!(merged.status, status);
        assert!(!merged.is_governed());
    }

    #[test]
    fn test_disabled_governance_overrides_local_enabled() {
        let status = base();
        assert!(status.enabled);

        let mut record = AgentGovernanceRecord::new("media-agent", "def-1");
        record.lifecycle_status = "Disabled".into();
        let merged = merge(&status, Some(&record));

        assert!(!merged.enabled());
        assert_eq!(merged.status.lifecycle, "Disabled");
        assert!(!merged.status.auto_runnable);
        assert_eq!(merged.status.impact, 8000.0);
        assert_eq!(merged.status.last_summary.as_deref(), Some("ran"));
    }

    #[test]
    fn test_active_governance_reenables_locally_disabled_agent() {
        let mut status = base();
        status.set_enabled(false);

        let mut record = AgentGovernanceRecord::new("media-agent", "def-1");
        record.auto_runnable = true;
        let merged = merge(&status, Some(&record));

        assert!(merged.enabled());
        assert_eq!(merged.status.lifecycle, "active");
        assert!(merged.status.auto_runnable);
    }

    #[test]
    fn test_retired_lifecycle_disables() {
        let mut record = AgentGovernanceRecord::new("media-agent", "def-1");
        record.lifecycle_status = "retired".into();
        assert!(!merge(&base(), Some(&record)).enabled());
    }
}
