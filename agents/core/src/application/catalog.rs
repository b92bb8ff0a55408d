// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Built-in Agent Catalogue
//!
//! The automations shipped with the console, grouped by the hub that shows
//! them (Projects, Content, Clients). Register them on a bus with
//! [`crate::application::bus::AgentBus::register_all`].

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::registry::RegisteredAgent;
use crate::domain::agent::{AgentCategory, AgentMeta, AgentRunInput, AgentRunOutput};
use crate::domain::scoring::{compute_trs_score, metric_config, TrsScoreInputs, TrsScoreResult};

pub const REVENUE_CLARITY_KEY: &str = "revenue-clarity";

/// Agent whose output never depends on its input.
fn fixed(meta: AgentMeta, summary: &'static str, data: serde_json::Value) -> RegisteredAgent {
    RegisteredAgent::from_fn(meta, move |_input: AgentRunInput| {
        let data = data.clone();
        async move { Ok(AgentRunOutput::ok(summary, data)) }
    })
}

pub fn builtin_agents() -> Vec<RegisteredAgent> {
    let mut agents = project_agents();
    agents.extend(content_agents());
    agents.extend(client_agents());
    agents
}

fn project_agents() -> Vec<RegisteredAgent> {
    vec![
        RegisteredAgent::from_fn(
            AgentMeta::new(
                "delivery-orchestrator",
                "Delivery Orchestrator",
                AgentCategory::Projects,
                "Advance RevOS phases and generate next 3 actions",
            )
            .with_icon("Workflow")
            .auto_runnable(),
            |input: AgentRunInput| async move {
                Ok(AgentRunOutput::ok(
                    "Set phase to Data; queued 3 next actions.",
                    json!({
                        "phase": "Data",
                        "next": ["Interview billing owner", "Connect Stripe", "Sample cohort export"],
                        "expectedImpact$": 3000,
                        "runBy": input.user_id,
                        "payload": input.payload,
                    }),
                ))
            },
        )
        .with_sample_payload(json!({ "clientId": "acme-co", "focus": "billing" })),
        fixed(
            AgentMeta::new("gap-discovery", "Gap Discovery", AgentCategory::Projects, "Run gap questions; extract levers")
                .with_icon("Search"),
            "Captured 12 answers; proposed 3 levers.",
            json!({
                "levers": [
                    { "name": "Raise Plus 5%", "impact$": 4000 },
                    { "name": "Prepay incentive", "impact$": 2500 },
                    { "name": "Partner co-sell", "impact$": 5000 },
                ],
                "expectedImpact$": 11500,
            }),
        ),
        fixed(
            AgentMeta::new("data-intake", "Data Intake", AgentCategory::Projects, "Map available vs collected data")
                .with_icon("Database"),
            "8/12 sources ready; flagged missing ARR field.",
            json!({ "completeness": 0.67, "missing": ["ARR", "ChurnReason"] }),
        ),
        fixed(
            AgentMeta::new("qra-strategy", "QRA Strategy", AgentCategory::Projects, "Compute price/offer/channel moves")
                .with_icon("Brain"),
            "Proposed pricing + retention play.",
            json!({
                "pricing": "+5% Plus; floor 12% disc",
                "retention": "N-day save sequence",
                "expectedImpact$": 9000,
            }),
        ),
        fixed(
            AgentMeta::new("build-planner", "Build Planner", AgentCategory::Projects, "Create Kanban plan and SLOs")
                .with_icon("Kanban"),
            "Critical path set; 2 SLOs risk.",
            json!({
                "columns": ["Backlog", "Doing", "Blocked", "Review", "Done"],
                "sloRisks": ["Auth latency p95", "Invoice job"],
            }),
        ),
        fixed(
            AgentMeta::new("compounding", "Compounding", AgentCategory::Projects, "Quantify new revenue vs baseline")
                .with_icon("BarChart2"),
            "$12.4k net new vs baseline; QTD forecast +$48k.",
            json!({ "dollarsAdvanced$": 12400, "forecastQTD": 48000 }),
        ),
    ]
}

fn content_agents() -> Vec<RegisteredAgent> {
    vec![
        fixed(
            AgentMeta::new("media-agent", "Media Agent", AgentCategory::Content, "Podcast + YouTube + shorts bundle")
                .with_icon("Mic")
                .auto_runnable(),
            "Generated pod + YT plan; 3 shorts; scheduled LI & Email.",
            json!({
                "expectedImpact$": 8000,
                "artifacts": ["podcast", "youtube", "shorts"],
                "channels": ["LinkedIn", "Email"],
            }),
        ),
        fixed(
            AgentMeta::new("brief-agent", "Brief Agent", AgentCategory::Content, "Generate persona-stage brief")
                .with_icon("FileText"),
            "Brief for CFO @ Proposal created.",
            json!({ "outline": ["Problem", "Offer", "Proof", "CTA"] }),
        ),
        RegisteredAgent::from_fn(
            AgentMeta::new("distribution-agent", "Distribution Agent", AgentCategory::Content, "Channel copy + UTM + schedule")
                .with_icon("Send"),
            |_input: AgentRunInput| async move {
                Ok(AgentRunOutput::ok(
                    "Scheduled LI + X with UTM.",
                    json!({
                        "utm": "utm_source=li&utm_campaign=revos",
                        "scheduledAt": Utc::now().to_rfc3339(),
                    }),
                ))
            },
        ),
        fixed(
            AgentMeta::new("attribution-agent", "Attribution Agent", AgentCategory::Content, "Assign influenced/advanced/closed")
                .with_icon("Target"),
            "Attributed $6k influenced; $2k closed.",
            json!({ "influenced$": 6000, "closedWon$": 2000 }),
        ),
    ]
}

fn client_agents() -> Vec<RegisteredAgent> {
    vec![
        fixed(
            AgentMeta::new("account-intel", "Account Intelligence", AgentCategory::Clients, "Stakeholders, goals, health")
                .with_icon("IdCard")
                .auto_runnable(),
            "Health: 72 (green); 2 risks flagged.",
            json!({ "health": 72, "risks": ["Champion bandwidth", "Security review"] }),
        ),
        fixed(
            AgentMeta::new("close-plan", "Close Plan", AgentCategory::Clients, "Mutual action plan").with_icon("Handshake"),
            "Next step set for 10/12.",
            json!({ "nextStep": "Security review call", "due": "2025-10-12" }),
        ),
        fixed(
            AgentMeta::new("commercials", "Commercials", AgentCategory::Clients, "Price/terms guardrails").with_icon("Scale"),
            "Price floor approved; Net30 → Net15.",
            json!({ "priceFloor": "-12%", "terms": "Net15", "expectedImpact$": 3500 }),
        ),
        fixed(
            AgentMeta::new("collections", "Collections", AgentCategory::Clients, "Dunning & recovery").with_icon("CreditCard"),
            "Dunning step 2 sent; $1.8k likely.",
            json!({ "dollarsAdvanced$": 1800 }),
        ),
        fixed(
            AgentMeta::new("client-health", "Client Health", AgentCategory::Clients, "Adoption & renewal risk")
                .with_icon("HeartPulse"),
            "Renewal risk low; expansion candidate.",
            json!({ "renewalRisk": "Low", "expansionSignal": true }),
        ),
        RegisteredAgent::from_fn(
            AgentMeta::new(
                REVENUE_CLARITY_KEY,
                "Revenue Clarity",
                AgentCategory::Clients,
                "Score revenue health and rank the levers worth pulling",
            )
            .with_icon("Gauge"),
            |input: AgentRunInput| async move { run_revenue_clarity(&input) },
        )
        .with_sample_payload(json!({
            "monthlyRevenue": 120000,
            "metrics": {
                "cac": 4.2, "nrr": 104, "churn": 6.5, "payback": 14,
                "margin": 62, "forecastMape": 18, "velocity": 1.1, "incidents": 2
            }
        })),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLever {
    pub name: String,
    pub delta: f64,
    #[serde(rename = "impact$")]
    pub impact: f64,
}

/// Turns every below-midpoint weighted driver into a lever sized as
/// `monthly_revenue × weight/100 × |delta|/100`, largest first.
pub fn prioritize_levers(score: &TrsScoreResult, monthly_revenue: f64) -> Vec<RevenueLever> {
    let mut levers: Vec<RevenueLever> = score
        .drivers
        .iter()
        .filter(|driver| driver.delta < 0.0)
        .filter_map(|driver| {
            let config = metric_config(driver.key?);
            if config.weight == 0.0 {
                return None;
            }
            let impact = (monthly_revenue * config.weight / 100.0 * driver.delta.abs() / 100.0).round();
            Some(RevenueLever {
                name: format!("Improve {}", driver.name),
                delta: driver.delta,
                impact,
            })
        })
        .collect();

    levers.sort_by(|a, b| b.impact.total_cmp(&a.impact).then_with(|| a.name.cmp(&b.name)));
    levers
}

fn run_revenue_clarity(input: &AgentRunInput) -> anyhow::Result<AgentRunOutput> {
    let metrics = input
        .payload
        .as_ref()
        .and_then(|payload| payload.get("metrics"))
        .cloned()
        .context("revenue-clarity requires payload.metrics")?;
    let inputs: TrsScoreInputs =
        serde_json::from_value(metrics).context("payload.metrics must carry all eight TRS metrics")?;

    let mut warnings = Vec::new();
    let monthly_revenue = match input.payload_f64("monthlyRevenue") {
        Some(revenue) if revenue >= 0.0 => revenue,
        _ => {
            warnings.push("monthlyRevenue missing; lever impact reported as $0".to_string());
            0.0
        }
    };

    let score = compute_trs_score(&inputs);
    let levers = prioritize_levers(&score, monthly_revenue);
    let expected_impact: f64 = levers.iter().map(|lever| lever.impact).sum();

    let summary = format!(
        "TRS {:.1} ({:?}); {} levers worth ${:.0}/mo.",
        score.score,
        score.band,
        levers.len(),
        expected_impact
    );

    Ok(AgentRunOutput {
        ok: true,
        summary: Some(summary),
        data: Some(json!({
            "score": score.score,
            "band": score.band,
            "drivers": score.drivers,
            "levers": levers,
            "expectedImpact$": expected_impact,
        })),
        warnings,
    })
}
