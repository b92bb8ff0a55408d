// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Actions
//!
//! The four operations the console exposes: list, run, logs and toggle.
//! Each authenticates through [`AuthProvider`], then coordinates the
//! [`AgentBus`], the [`GovernanceLoader`] and the hosted functions.
//!
//! ## Run pipeline
//!
//! ```text
//! authenticate -> require organization -> agent registered?
//!   -> agent-run function (best effort) -> local handler
//!   -> agent_runs audit row -> agent.run.completed analytics
//! ```
//!
//! Only authentication, the organization check, an unknown key and a failing
//! handler abort a run. The remote mirror, the audit row and analytics are
//! logged and skipped on error.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::bus::{AgentBus, BusError};
use crate::application::governance::{GovernanceLoader, PersistAgentRunInput};
use crate::domain::agent::{AgentKey, AgentMeta, AgentRunInput, AgentRunOutput, AgentStatus};
use crate::domain::auth::{AuthContext, AuthProvider, Credentials, AGENTS_LOGIN_REDIRECT};
use crate::domain::governance::{merge, AgentRunRecord, EffectiveAgentStatus, OrganizationId};
use crate::domain::remote::{AnalyticsEvent, AnalyticsSink, RemoteAgentRunner, RemoteRunOutcome, RemoteRunRequest};
use crate::domain::repository::RepositoryError;
use crate::domain::run_log::RunLogEntry;

pub const EVENT_AGENT_RUN_COMPLETED: &str = "agent.run.completed";
pub const EVENT_AGENT_TOGGLED: &str = "agent.toggled";
const ANALYTICS_ENTITY: &str = "agent";

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Not signed in")]
    Unauthenticated { redirect_to: String },

    #[error("No organization found for user")]
    MissingOrganization,

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentKey),

    #[error("Agent {key} failed: {reason}")]
    AgentFailed { key: AgentKey, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<BusError> for ActionError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::UnknownAgent(key) => ActionError::UnknownAgent(key),
            BusError::AgentFailed { key, reason } => ActionError::AgentFailed { key, reason },
        }
    }
}

/// An agent as shown to a tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub meta: AgentMeta,
    pub status: EffectiveAgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_payload: Option<serde_json::Value>,
}

/// Local output next to what happened to the remote mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRunResult {
    pub local: AgentRunOutput,
    pub remote: RemoteRunOutcome,
}

pub struct AgentActions {
    bus: Arc<AgentBus>,
    auth: Arc<dyn AuthProvider>,
    governance: Arc<GovernanceLoader>,
    remote: Option<Arc<dyn RemoteAgentRunner>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
}

impl AgentActions {
    pub fn new(bus: Arc<AgentBus>, auth: Arc<dyn AuthProvider>, governance: Arc<GovernanceLoader>) -> Self {
        Self {
            bus,
            auth,
            governance,
            remote: None,
            analytics: None,
        }
    }

    pub fn with_remote_runner(mut self, remote: Arc<dyn RemoteAgentRunner>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn bus(&self) -> &Arc<AgentBus> {
        &self.bus
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthContext, ActionError> {
        self.auth
            .get_auth_context(credentials)
            .await
            .ok_or_else(|| ActionError::Unauthenticated {
                redirect_to: AGENTS_LOGIN_REDIRECT.to_string(),
            })
    }

    pub async fn action_list_agents(&self, credentials: &Credentials) -> Result<Vec<AgentView>, ActionError> {
        let ctx = self.authenticate(credentials).await?;
        let listing = self.bus.list_agents();

        let Some(org) = ctx.organization_id else {
            return Ok(listing
                .into_iter()
                .map(|agent| AgentView {
                    status: merge(&agent.status, None),
                    meta: agent.meta,
                    sample_payload: agent.sample_payload,
                })
                .collect());
        };

        let keys: Vec<AgentKey> = listing.iter().map(|agent| agent.meta.key.clone()).collect();
        let governance = self.governance.load_agent_governance(&org, &keys).await;

        Ok(listing
            .into_iter()
            .map(|agent| AgentView {
                status: merge(&agent.status, governance.get(&agent.meta.key)),
                meta: agent.meta,
                sample_payload: agent.sample_payload,
            })
            .collect())
    }

    pub async fn action_run_agent(
        &self,
        credentials: &Credentials,
        key: &AgentKey,
        payload: Option<serde_json::Value>,
    ) -> Result<AgentRunResult, ActionError> {
        let ctx = self.authenticate(credentials).await?;
        let org = ctx.organization_id.clone().ok_or(ActionError::MissingOrganization)?;

        if !self.bus.contains(key) {
            return Err(ActionError::UnknownAgent(key.clone()));
        }

        let remote = self.mirror_run(&ctx.user_id, &org, key, payload.as_ref()).await;

        let input = AgentRunInput {
            user_id: ctx.user_id.clone(),
            org_id: Some(org.0.clone()),
            payload: payload.clone(),
        };
        let local = self.bus.run_agent(key, input).await?;

        self.governance
            .persist_agent_run_record(PersistAgentRunInput {
                agent_key: key.clone(),
                organization_id: org.clone(),
                user_id: ctx.user_id.clone(),
                input: payload.unwrap_or_else(|| json!({})),
                output: serde_json::to_value(&local).unwrap_or_else(|_| json!({})),
                summary: local.summary.clone(),
                guardrail_violations: Vec::new(),
            })
            .await;

        self.emit_analytics(
            AnalyticsEvent::new(EVENT_AGENT_RUN_COMPLETED, ctx.user_id.clone(), Some(org))
                .for_entity(ANALYTICS_ENTITY, key.as_str())
                .with_payload(json!({
                    "agent_key": key,
                    "run_id": remote.run_id(),
                    "summary": local.summary,
                })),
        )
        .await;

        info!(agent = %key, user_id = %ctx.user_id, "Agent run finished");
        Ok(AgentRunResult { local, remote })
    }

    async fn mirror_run(
        &self,
        user_id: &str,
        org: &OrganizationId,
        key: &AgentKey,
        payload: Option<&serde_json::Value>,
    ) -> RemoteRunOutcome {
        let Some(remote) = &self.remote else {
            return RemoteRunOutcome::Disabled;
        };

        let request = RemoteRunRequest {
            agent_key: key.clone(),
            user_id: user_id.to_string(),
            organization_id: org.clone(),
            payload: payload.cloned().unwrap_or_else(|| json!({})),
        };

        match remote.invoke_agent_run(&request).await {
            Ok(response) => RemoteRunOutcome::Mirrored {
                run_id: response.run_id,
                summary: response.summary,
            },
            Err(e) => {
                error!(event = "agents:remote-run-failed", agent = %key, error = %e, "Remote agent run failed");
                RemoteRunOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    /// Bus logs for `key`, newest first. Not scoped to a caller.
    pub fn action_logs(&self, key: &AgentKey, limit: Option<usize>) -> Vec<RunLogEntry> {
        self.bus.logs_for(key, limit)
    }

    /// Persisted audit rows for the caller's organization, newest first.
    /// Unlike [`Self::action_logs`] these survive restarts.
    pub async fn action_run_history(
        &self,
        credentials: &Credentials,
        key: &AgentKey,
        limit: Option<usize>,
    ) -> Result<Vec<AgentRunRecord>, ActionError> {
        let ctx = self.authenticate(credentials).await?;
        let org = ctx.organization_id.ok_or(ActionError::MissingOrganization)?;

        if !self.bus.contains(key) {
            return Err(ActionError::UnknownAgent(key.clone()));
        }

        let limit = limit.unwrap_or_else(|| self.bus.default_log_limit());
        Ok(self.governance.recent_runs(&org, key, limit).await?)
    }

    pub async fn action_toggle_agent(
        &self,
        credentials: &Credentials,
        key: &AgentKey,
        enabled: bool,
    ) -> Result<AgentStatus, ActionError> {
        let ctx = self.authenticate(credentials).await?;

        if !self.bus.contains(key) {
            return Err(ActionError::UnknownAgent(key.clone()));
        }

        self.emit_analytics(
            AnalyticsEvent::new(EVENT_AGENT_TOGGLED, ctx.user_id.clone(), ctx.organization_id.clone())
                .for_entity(ANALYTICS_ENTITY, key.as_str())
                .with_payload(json!({ "agent_key": key, "enabled": enabled })),
        )
        .await;

        match &ctx.organization_id {
            Some(org) => {
                if let Err(e) = self.governance.record_toggle(org, key, enabled, &ctx.user_id).await {
                    error!(
                        event = "agents:toggle-persist-failed",
                        agent = %key,
                        organization_id = %org,
                        error = %e,
                        "Failed to persist agent toggle"
                    );
                }
            }
            None => {
                warn!(agent = %key, user_id = %ctx.user_id, "Toggling agent without organization; change is local only");
            }
        }

        Ok(self.bus.set_enabled(key, enabled)?)
    }

    /// Best effort. Events without an organization are not sent.
    async fn emit_analytics(&self, event: AnalyticsEvent) {
        let Some(analytics) = &self.analytics else {
            return;
        };
        if event.organization_id.is_none() {
            debug!(event_key = %event.event_key, "Skipping analytics event without organization");
            return;
        }

        let event_key = event.event_key.clone();
        if let Err(e) = analytics.emit(event).await {
            error!(event = "analytics:invoke-error", event_key = %event_key, error = %e, "Failed to emit analytics event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::RegisteredAgent;
    use crate::domain::agent::AgentCategory;
    use crate::domain::remote::{RemoteError, RemoteRunResponse};
    use crate::infrastructure::auth::StaticAuthProvider;
    use crate::infrastructure::repositories::{InMemoryAgentRunRepository, InMemoryGovernanceRepository};
    use async_trait::async_trait;

    struct FailingRunner;

    #[async_trait]
    impl RemoteAgentRunner for FailingRunner {
        async fn invoke_agent_run(&self, _: &RemoteRunRequest) -> Result<RemoteRunResponse, RemoteError> {
            Err(RemoteError::Transport("connection reset".to_string()))
        }
    }

    fn actions(ctx: Option<AuthContext>) -> AgentActions {
        let bus = Arc::new(AgentBus::default());
        bus.register(RegisteredAgent::from_fn(
            AgentMeta::new("echo", "Echo", AgentCategory::Projects, "Echo"),
            |input: AgentRunInput| async move {
                Ok(AgentRunOutput::ok("echoed", input.payload.unwrap_or_default()))
            },
        ));
        let loader = Arc::new(GovernanceLoader::new(
            Arc::new(InMemoryGovernanceRepository::new()),
            Arc::new(InMemoryAgentRunRepository::new()),
        ));
        AgentActions::new(bus, Arc::new(StaticAuthProvider::new(ctx)), loader)
    }

    #[tokio::test]
    async fn test_unauthenticated_gets_redirect() {
        let err = actions(None)
            .action_list_agents(&Credentials::anonymous())
            .await
            .unwrap_err();
        match err {
            ActionError::Unauthenticated { redirect_to } => assert_eq!(redirect_to, "/login?next=/agents"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_fatal() {
        let actions = actions(Some(AuthContext::new("u1", Some(OrganizationId::new("org-1")))))
            .with_remote_runner(Arc::new(FailingRunner));

        let result = actions
            .action_run_agent(&Credentials::anonymous(), &AgentKey::new("echo"), Some(json!({"x": 1})))
            .await
            .unwrap();
        assert_eq!(result.local.summary.as_deref(), Some("echoed"));
        assert!(matches!(result.remote, RemoteRunOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_remote_disabled_without_runner() {
        let actions = actions(Some(AuthContext::new("u1", Some(OrganizationId::new("org-1")))));
        let result = actions
            .action_run_agent(&Credentials::anonymous(), &AgentKey::new("echo"), None)
            .await
            .unwrap();
        assert_eq!(result.remote, RemoteRunOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_unknown_agent_rejected_before_running() {
        let actions = actions(Some(AuthContext::new("u1", Some(OrganizationId::new("org-1")))));
        let err = actions
            .action_run_agent(&Credentials::anonymous(), &AgentKey::new("ghost"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UnknownAgent(_)));
    }

    #[tokio::test]
    async fn test_toggle_without_org_updates_bus() {
        let actions = actions(Some(AuthContext::new("u1", None)));
        let status = actions
            .action_toggle_agent(&Credentials::anonymous(), &AgentKey::new("echo"), false)
            .await
            .unwrap();
        assert!(!status.enabled);
        assert_eq!(status.lifecycle, "disabled");
    }
}
