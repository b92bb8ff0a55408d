// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Bus behaviour as the console relies on it: registration, run
//! bookkeeping, impact accumulation and log ordering.

use revos_core::application::bus::AgentBus;
use revos_core::application::catalog::builtin_agents;
use revos_core::application::registry::RegisteredAgent;
use revos_core::domain::agent::{AgentCategory, AgentKey, AgentMeta, AgentRunInput, AgentRunOutput};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn test_agent() -> RegisteredAgent {
    let calls = Arc::new(AtomicUsize::new(0));
    RegisteredAgent::from_fn(
        AgentMeta::new("test-agent", "Test Agent", AgentCategory::Projects, "Scripted outputs").auto_runnable(),
        move |_input: AgentRunInput| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(match call {
                    0 => AgentRunOutput::ok("done", json!({ "expectedImpact$": 500 })),
                    _ => AgentRunOutput {
                        ok: true,
                        summary: None,
                        data: Some(json!({ "dollarsAdvanced$": 300 })),
                        warnings: vec![],
                    },
                })
            }
        },
    )
}

#[tokio::test]
async fn test_agent_first_run_records_impact_and_summary() {
    let bus = AgentBus::default();
    bus.register(test_agent());
    let key = AgentKey::new("test-agent");

    bus.run_agent(&key, AgentRunInput::new("u1")).await.unwrap();

    assert_eq!(bus.logs_for(&key, None).len(), 1);
    let status = bus.status(&key).unwrap();
    assert_eq!(status.impact, 500.0);
    assert_eq!(status.last_summary.as_deref(), Some("done"));
    assert!(status.auto_runnable);
}

#[tokio::test]
async fn test_agent_second_run_adds_dollars_advanced() {
    let bus = AgentBus::default();
    bus.register(test_agent());
    let key = AgentKey::new("test-agent");

    bus.run_agent(&key, AgentRunInput::new("u1").with_payload(json!({ "call": 1 })))
        .await
        .unwrap();
    bus.run_agent(&key, AgentRunInput::new("u1").with_payload(json!({ "call": 2 })))
        .await
        .unwrap();

    let status = bus.status(&key).unwrap();
    assert_eq!(status.impact, 800.0);
    assert_eq!(status.last_summary.as_deref(), Some("Completed"));

    let logs = bus.logs_for(&key, None);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].input.payload, Some(json!({ "call": 2 })));
    assert_eq!(logs[1].input.payload, Some(json!({ "call": 1 })));
}

#[tokio::test]
async fn test_logs_are_per_key() {
    let bus = AgentBus::default();
    bus.register_all(builtin_agents());

    bus.run_agent(&AgentKey::new("collections"), AgentRunInput::new("u1"))
        .await
        .unwrap();
    bus.run_agent(&AgentKey::new("compounding"), AgentRunInput::new("u1"))
        .await
        .unwrap();

    let logs = bus.logs_for(&AgentKey::new("collections"), None);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].key.as_str(), "collections");
}

#[tokio::test]
async fn test_run_log_evicts_oldest_beyond_capacity() {
    let bus = AgentBus::new(3);
    bus.register_all(builtin_agents());
    let key = AgentKey::new("brief-agent");

    for n in 0..5 {
        bus.run_agent(&key, AgentRunInput::new("u1").with_payload(json!({ "n": n })))
            .await
            .unwrap();
    }

    let logs = bus.logs_for(&key, Some(10));
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].input.payload, Some(json!({ "n": 4 })));
    assert_eq!(logs[2].input.payload, Some(json!({ "n": 2 })));
}

#[tokio::test]
async fn test_builtin_catalogue_registers_in_order() {
    let bus = AgentBus::default();
    bus.register_all(builtin_agents());
    bus.register_all(builtin_agents());

    let listing = bus.list_agents();
    assert_eq!(listing.len(), 16);
    assert_eq!(listing[0].meta.key.as_str(), "delivery-orchestrator");
    assert_eq!(listing[15].meta.key.as_str(), "revenue-clarity");
    assert_eq!(
        listing[0].sample_payload,
        Some(json!({ "clientId": "acme-co", "focus": "billing" }))
    );
}

#[tokio::test]
async fn test_concurrent_runs_accumulate_impact() {
    let bus = Arc::new(AgentBus::default());
    bus.register_all(builtin_agents());
    let key = AgentKey::new("commercials");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let bus = bus.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            bus.run_agent(&key, AgentRunInput::new("u1")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(bus.status(&key).unwrap().impact, 35_000.0);
    assert_eq!(bus.logs_for(&key, None).len(), 10);
}
