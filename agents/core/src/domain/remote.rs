// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Remote Agent Runs and Analytics
//!
//! Ports for the two serverless functions a run is mirrored to: `agent-run`,
//! which records the run on the hosted side and returns its run id, and
//! `analytics-events`, which receives console analytics.
//!
//! Both are best effort from the facade's point of view. Local execution is
//! canonical; the remote outcome is reported next to it as a
//! [`RemoteRunOutcome`] instead of being merged into the local result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentKey;
use crate::domain::governance::OrganizationId;

pub const AGENT_RUN_FUNCTION: &str = "agent-run";
pub const ANALYTICS_FUNCTION: &str = "analytics-events";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRunRequest {
    pub agent_key: AgentKey,
    pub user_id: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRunResponse {
    pub ok: bool,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What happened to the remote mirror of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteRunOutcome {
    Mirrored {
        run_id: Option<String>,
        summary: Option<String>,
    },
    Failed {
        reason: String,
    },
    Disabled,
}

impl RemoteRunOutcome {
    pub fn run_id(&self) -> Option<&str> {
        match self {
            RemoteRunOutcome::Mirrored { run_id, .. } => run_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("function {function} returned HTTP {status}: {body}")]
    Status {
        function: String,
        status: u16,
        body: String,
    },

    #[error("function {function} reported failure: {reason}")]
    Rejected { function: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RemoteAgentRunner: Send + Sync {
    async fn invoke_agent_run(&self, request: &RemoteRunRequest) -> Result<RemoteRunResponse, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_key: String,
    pub organization_id: Option<OrganizationId>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub payload: serde_json::Value,
}

impl AnalyticsEvent {
    pub fn new(event_key: impl Into<String>, user_id: impl Into<String>, organization_id: Option<OrganizationId>) -> Self {
        Self {
            event_key: event_key.into(),
            organization_id,
            user_id: user_id.into(),
            entity: None,
            entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn for_entity(mut self, entity: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn emit(&self, event: AnalyticsEvent) -> Result<(), RemoteError>;
}
