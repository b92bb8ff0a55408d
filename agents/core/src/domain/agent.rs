// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Domain Types
//!
//! Static agent metadata, the mutable per-agent status owned by the bus, and
//! the run input/output payloads exchanged with handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle label written when an agent is enabled.
pub const LIFECYCLE_ACTIVE: &str = "active";
/// Lifecycle label written when an agent is disabled.
pub const LIFECYCLE_DISABLED: &str = "disabled";
/// Lifecycle label for agents withdrawn by an administrator.
pub const LIFECYCLE_RETIRED: &str = "retired";

/// Stable identifier of a registered agent (e.g. `delivery-orchestrator`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKey(pub String);

impl AgentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for AgentKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AgentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentCategory {
    Projects,
    Content,
    Clients,
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentCategory::Projects => "Projects",
            AgentCategory::Content => "Content",
            AgentCategory::Clients => "Clients",
        };
        f.pad(label)
    }
}

/// Immutable description of an agent, fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMeta {
    pub key: AgentKey,
    pub name: String,
    pub category: AgentCategory,
    pub description: String,

    /// UI icon hint (lucide icon name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub auto_runnable: bool,
}

impl AgentMeta {
    pub fn new(
        key: impl Into<AgentKey>,
        name: impl Into<String>,
        category: AgentCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            category,
            description: description.into(),
            icon: None,
            auto_runnable: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn auto_runnable(mut self) -> Self {
        self.auto_runnable = true;
        self
    }
}

/// Mutable runtime status of one agent, owned by the bus.
///
/// `impact` is a running dollar total and only ever grows by the
/// contribution of each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_summary: Option<String>,
    #[serde(rename = "impact$")]
    pub impact: f64,
    pub lifecycle: String,
    pub auto_runnable: bool,
}

impl AgentStatus {
    /// Initial status for a freshly registered agent.
    pub fn initial(meta: &AgentMeta) -> Self {
        Self {
            enabled: true,
            last_run: None,
            last_summary: None,
            impact: 0.0,
            lifecycle: LIFECYCLE_ACTIVE.to_string(),
            auto_runnable: meta.auto_runnable,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.lifecycle = lifecycle_label(enabled).to_string();
    }
}

/// Lifecycle label mirrored from an enabled flag.
pub fn lifecycle_label(enabled: bool) -> &'static str {
    if enabled {
        LIFECYCLE_ACTIVE
    } else {
        LIFECYCLE_DISABLED
    }
}

/// Derives enablement from a free-text lifecycle status.
pub fn lifecycle_enables(lifecycle_status: &str) -> bool {
    let status = lifecycle_status.trim();
    !(status.eq_ignore_ascii_case(LIFECYCLE_DISABLED) || status.eq_ignore_ascii_case(LIFECYCLE_RETIRED))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunInput {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl AgentRunInput {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: None,
            payload: None,
        }
    }

    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Reads a numeric field from the payload.
    pub fn payload_f64(&self, field: &str) -> Option<f64> {
        self.payload.as_ref()?.get(field)?.as_f64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunOutput {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AgentRunOutput {
    pub fn ok(summary: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            ok: true,
            summary: Some(summary.into()),
            data: Some(data),
            warnings: Vec::new(),
        }
    }

    /// Summary recorded on the status after a run.
    pub fn status_summary(&self) -> String {
        match &self.summary {
            Some(summary) => summary.clone(),
            None if self.ok => "Completed".to_string(),
            None => "Failed".to_string(),
        }
    }

    /// Dollar contribution of this run: `expectedImpact$`, else
    /// `dollarsAdvanced$`, else zero.
    pub fn impact_contribution(&self) -> f64 {
        let Some(data) = &self.data else {
            return 0.0;
        };
        ["expectedImpact$", "dollarsAdvanced$"]
            .iter()
            .find_map(|field| data.get(*field).and_then(json_number))
            .unwrap_or(0.0)
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
