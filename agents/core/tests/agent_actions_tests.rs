// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end facade tests with in-memory repositories and recording
//! collaborators for the hosted functions.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use revos_core::application::actions::{ActionError, AgentActions};
use revos_core::application::bus::AgentBus;
use revos_core::application::catalog::builtin_agents;
use revos_core::application::governance::GovernanceLoader;
use revos_core::application::registry::RegisteredAgent;
use revos_core::domain::agent::{AgentCategory, AgentKey, AgentMeta, AgentRunInput};
use revos_core::domain::auth::{AuthContext, Credentials};
use revos_core::domain::governance::{AgentGovernanceRecord, OrganizationId};
use revos_core::domain::remote::{
    AnalyticsEvent, AnalyticsSink, RemoteAgentRunner, RemoteError, RemoteRunOutcome, RemoteRunRequest,
    RemoteRunResponse,
};
use revos_core::domain::repository::GovernanceRepository;
use revos_core::infrastructure::auth::StaticAuthProvider;
use revos_core::infrastructure::repositories::{
    FailingAgentRunRepository, FailingGovernanceRepository, InMemoryAgentRunRepository,
    InMemoryGovernanceRepository,
};

#[derive(Default)]
struct RecordingRunner {
    requests: Mutex<Vec<RemoteRunRequest>>,
}

#[async_trait]
impl RemoteAgentRunner for RecordingRunner {
    async fn invoke_agent_run(&self, request: &RemoteRunRequest) -> Result<RemoteRunResponse, RemoteError> {
        self.requests.lock().push(request.clone());
        Ok(RemoteRunResponse {
            ok: true,
            run_id: Some("run-1".to_string()),
            summary: Some(format!("Agent {} executed via edge function stub.", request.agent_key)),
            error: None,
        })
    }
}

#[derive(Default)]
struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn emit(&self, event: AnalyticsEvent) -> Result<(), RemoteError> {
        self.events.lock().push(event);
        Ok(())
    }
}

struct Harness {
    actions: AgentActions,
    bus: Arc<AgentBus>,
    governance: Arc<InMemoryGovernanceRepository>,
    runs: Arc<InMemoryAgentRunRepository>,
    runner: Arc<RecordingRunner>,
    analytics: Arc<RecordingAnalytics>,
}

fn org() -> OrganizationId {
    OrganizationId::new("org-1")
}

fn harness(ctx: Option<AuthContext>) -> Harness {
    let bus = Arc::new(AgentBus::default());
    bus.register_all(builtin_agents());
    bus.register(RegisteredAgent::from_fn(
        AgentMeta::new("flaky", "Flaky", AgentCategory::Content, "Always fails"),
        |_input: AgentRunInput| async move { Err(anyhow::anyhow!("quota exceeded")) },
    ));

    let governance = Arc::new(InMemoryGovernanceRepository::new());
    let runs = Arc::new(InMemoryAgentRunRepository::new());
    let runner = Arc::new(RecordingRunner::default());
    let analytics = Arc::new(RecordingAnalytics::default());

    let loader = Arc::new(GovernanceLoader::new(governance.clone(), runs.clone()));
    let actions = AgentActions::new(bus.clone(), Arc::new(StaticAuthProvider::new(ctx)), loader)
        .with_remote_runner(runner.clone())
        .with_analytics(analytics.clone());

    Harness {
        actions,
        bus,
        governance,
        runs,
        runner,
        analytics,
    }
}

fn member() -> Option<AuthContext> {
    Some(AuthContext::new("u1", Some(org())))
}

#[tokio::test]
async fn test_run_without_organization_has_no_side_effects() {
    let h = harness(Some(AuthContext::new("u1", None)));
    let key = AgentKey::new("media-agent");

    let err = h
        .actions
        .action_run_agent(&Credentials::anonymous(), &key, Some(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::MissingOrganization));

    assert!(h.bus.logs_for(&key, None).is_empty());
    assert!(h.runner.requests.lock().is_empty());
    assert!(h.runs.records().is_empty());
    assert!(h.analytics.events.lock().is_empty());
    assert_eq!(h.bus.status(&key).unwrap().impact, 0.0);
}

#[tokio::test]
async fn test_run_pipeline() {
    let h = harness(member());
    let key = AgentKey::new("delivery-orchestrator");

    let result = h
        .actions
        .action_run_agent(&Credentials::anonymous(), &key, Some(json!({ "clientId": "acme-co" })))
        .await
        .unwrap();

    assert_eq!(result.local.summary.as_deref(), Some("Set phase to Data; queued 3 next actions."));
    assert_eq!(result.remote.run_id(), Some("run-1"));

    let requests = h.runner.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].organization_id, org());
    assert_eq!(requests[0].payload, json!({ "clientId": "acme-co" }));

    let records = h.runs.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_input, json!({ "clientId": "acme-co" }));
    assert_eq!(records[0].run_output["data"]["expectedImpact$"], 3000);

    let events = h.analytics.events.lock().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_key, "agent.run.completed");
    assert_eq!(events[0].payload["run_id"], "run-1");

    assert_eq!(h.bus.status(&key).unwrap().impact, 3000.0);
}

#[tokio::test]
async fn test_failed_run_is_logged_and_not_persisted() {
    let h = harness(member());
    let key = AgentKey::new("flaky");

    let err = h
        .actions
        .action_run_agent(&Credentials::anonymous(), &key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::AgentFailed { ref reason, .. } if reason == "quota exceeded"));

    let logs = h.bus.logs_for(&key, None);
    assert_eq!(logs.len(), 1);
    assert!(logs[0].outcome.is_failure());
    assert_eq!(
        h.bus.status(&key).unwrap().last_summary.as_deref(),
        Some("Failed: quota exceeded")
    );
    assert!(h.runs.records().is_empty());
    assert!(h.analytics.events.lock().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_does_not_fail_run() {
    let bus = Arc::new(AgentBus::default());
    bus.register_all(builtin_agents());
    let loader = Arc::new(GovernanceLoader::new(
        Arc::new(InMemoryGovernanceRepository::new()),
        Arc::new(FailingAgentRunRepository),
    ));
    let actions = AgentActions::new(bus, Arc::new(StaticAuthProvider::new(member())), loader);

    let result = actions
        .action_run_agent(&Credentials::anonymous(), &AgentKey::new("collections"), None)
        .await
        .unwrap();
    assert_eq!(result.remote, RemoteRunOutcome::Disabled);
    assert_eq!(result.local.summary.as_deref(), Some("Dunning step 2 sent; $1.8k likely."));
}

#[tokio::test]
async fn test_governance_disabled_overrides_local_enabled() {
    let h = harness(member());
    let mut record = AgentGovernanceRecord::new("media-agent", "def-1");
    record.lifecycle_status = "Disabled".to_string();
    h.governance.publish(&org(), record);

    let agents = h.actions.action_list_agents(&Credentials::anonymous()).await.unwrap();
    let media = agents.iter().find(|a| a.meta.key.as_str() == "media-agent").unwrap();
    assert!(!media.status.enabled());
    assert!(media.status.is_governed());

    // local state is untouched
    assert!(h.bus.status(&AgentKey::new("media-agent")).unwrap().enabled);

    let other = agents.iter().find(|a| a.meta.key.as_str() == "brief-agent").unwrap();
    assert!(other.status.enabled());
    assert!(!other.status.is_governed());
}

#[tokio::test]
async fn test_listing_queries_governance_once_for_listed_keys() {
    let h = harness(member());
    h.actions.action_list_agents(&Credentials::anonymous()).await.unwrap();
    assert_eq!(h.governance.query_count(), 1);
}

#[tokio::test]
async fn test_listing_without_organization_skips_governance() {
    let h = harness(Some(AuthContext::new("u1", None)));
    let agents = h.actions.action_list_agents(&Credentials::anonymous()).await.unwrap();
    assert_eq!(agents.len(), 17);
    assert_eq!(h.governance.query_count(), 0);
}

#[tokio::test]
async fn test_listing_survives_governance_outage() {
    let bus = Arc::new(AgentBus::default());
    bus.register_all(builtin_agents());
    let loader = Arc::new(GovernanceLoader::new(
        Arc::new(FailingGovernanceRepository),
        Arc::new(InMemoryAgentRunRepository::new()),
    ));
    let actions = AgentActions::new(bus, Arc::new(StaticAuthProvider::new(member())), loader);

    let agents = actions.action_list_agents(&Credentials::anonymous()).await.unwrap();
    assert_eq!(agents.len(), 16);
    assert!(agents.iter().all(|a| a.status.enabled() && !a.status.is_governed()));
}

#[tokio::test]
async fn test_toggle_with_organization_persists_and_updates_bus() {
    let h = harness(member());
    let key = AgentKey::new("account-intel");

    let status = h
        .actions
        .action_toggle_agent(&Credentials::anonymous(), &key, false)
        .await
        .unwrap();
    assert!(!status.enabled);

    let rows = h.governance.find_for_keys(&org(), &[key.clone()]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.lifecycle_status, "disabled");

    let events = h.analytics.events.lock().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_key, "agent.toggled");
    assert_eq!(events[0].payload["enabled"], false);
}

#[tokio::test]
async fn test_toggle_survives_governance_write_failure() {
    let bus = Arc::new(AgentBus::default());
    bus.register_all(builtin_agents());
    let loader = Arc::new(GovernanceLoader::new(
        Arc::new(FailingGovernanceRepository),
        Arc::new(InMemoryAgentRunRepository::new()),
    ));
    let actions = AgentActions::new(bus.clone(), Arc::new(StaticAuthProvider::new(member())), loader);
    let key = AgentKey::new("close-plan");

    let status = actions
        .action_toggle_agent(&Credentials::anonymous(), &key, false)
        .await
        .unwrap();
    assert!(!status.enabled);
    assert!(!bus.status(&key).unwrap().enabled);
}

#[tokio::test]
async fn test_toggle_without_organization_is_local_only() {
    let h = harness(Some(AuthContext::new("u1", None)));
    let key = AgentKey::new("gap-discovery");

    h.actions
        .action_toggle_agent(&Credentials::anonymous(), &key, false)
        .await
        .unwrap();

    assert!(!h.bus.status(&key).unwrap().enabled);
    assert!(h.analytics.events.lock().is_empty());
}

#[tokio::test]
async fn test_logs_need_no_authentication() {
    let h = harness(None);
    let logs = h.actions.action_logs(&AgentKey::new("media-agent"), Some(5));
    assert!(logs.is_empty());

    let err = h.actions.action_list_agents(&Credentials::anonymous()).await.unwrap_err();
    assert!(matches!(err, ActionError::Unauthenticated { .. }));
}

#[tokio::test]
async fn test_run_history_returns_persisted_rows_newest_first() {
    let h = harness(member());
    let key = AgentKey::new("brief-agent");

    for n in 0..3 {
        h.actions
            .action_run_agent(&Credentials::anonymous(), &key, Some(json!({ "n": n })))
            .await
            .unwrap();
    }

    let history = h
        .actions
        .action_run_history(&Credentials::anonymous(), &key, Some(2))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].run_input, json!({ "n": 2 }));

    let err = h
        .actions
        .action_run_history(&Credentials::anonymous(), &AgentKey::new("ghost"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnknownAgent(_)));
}
