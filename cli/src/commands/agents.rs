// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Agent commands
//!
//! Commands: list, run, logs, history, toggle, catalog
//!
//! Everything except `catalog` goes through the actions facade as the
//! configured operator (`spec.auth.operator`).

use anyhow::{Context, Result};
use clap::{ArgGroup, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use revos_core::application::actions::{ActionError, AgentRunResult, AgentView};
use revos_core::application::catalog::builtin_agents;
use revos_core::domain::agent::AgentKey;
use revos_core::domain::auth::Credentials;
use revos_core::domain::governance::AgentRunRecord;
use revos_core::domain::remote::RemoteRunOutcome;
use revos_core::domain::run_log::{RunLogEntry, RunOutcome};

use crate::services::{AuthMode, ConsoleServices};

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List agents with governance applied
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run an agent once
    #[command(group(ArgGroup::new("input").args(["payload", "payload_file", "sample"])))]
    Run {
        /// Agent key, e.g. delivery-orchestrator
        #[arg(value_name = "KEY")]
        key: String,

        /// Inline JSON payload
        #[arg(short, long, value_name = "JSON")]
        payload: Option<String>,

        /// Read the JSON payload from a file
        #[arg(long, value_name = "FILE")]
        payload_file: Option<PathBuf>,

        /// Use the agent's registered sample payload
        #[arg(long)]
        sample: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show this process's run log for an agent
    Logs {
        #[arg(value_name = "KEY")]
        key: String,

        /// Maximum entries (default: spec.bus.default_log_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show persisted runs for the operator's organization
    History {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Enable or disable an agent
    #[command(group(ArgGroup::new("state").args(["enable", "disable"]).required(true)))]
    Toggle {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(long)]
        enable: bool,

        #[arg(long)]
        disable: bool,
    },

    /// Print the built-in agent catalogue (no configuration needed)
    Catalog {
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: AgentsCommand, config_path: Option<PathBuf>) -> Result<()> {
    if let AgentsCommand::Catalog { json } = command {
        return catalog(json);
    }

    let services = ConsoleServices::load(config_path, AuthMode::Operator).await?;
    let credentials = Credentials::anonymous();

    match command {
        AgentsCommand::List { json } => {
            let agents = services.actions.action_list_agents(&credentials).await.map_err(explain)?;
            if json {
                print_json(&agents)
            } else {
                print_agents(&agents);
                Ok(())
            }
        }
        AgentsCommand::Run {
            key,
            payload,
            payload_file,
            sample,
            json,
        } => {
            let key = AgentKey::new(key);
            let payload = if sample {
                services.bus.get_agent(&key)?.sample_payload
            } else {
                parse_payload(payload.as_deref(), payload_file.as_ref())?
            };
            let result = services
                .actions
                .action_run_agent(&credentials, &key, payload)
                .await
                .map_err(explain)?;
            if json {
                print_json(&result)
            } else {
                print_run(&key, &result);
                Ok(())
            }
        }
        AgentsCommand::Logs { key, limit, json } => {
            let logs = services.actions.action_logs(&AgentKey::new(key), limit);
            if json {
                print_json(&logs)
            } else {
                print_logs(&logs);
                Ok(())
            }
        }
        AgentsCommand::History { key, limit, json } => {
            let runs = services
                .actions
                .action_run_history(&credentials, &AgentKey::new(key), limit)
                .await
                .map_err(explain)?;
            if json {
                print_json(&runs)
            } else {
                print_history(&runs);
                Ok(())
            }
        }
        AgentsCommand::Toggle { key, enable, .. } => {
            let key = AgentKey::new(key);
            let status = services
                .actions
                .action_toggle_agent(&credentials, &key, enable)
                .await
                .map_err(explain)?;
            let message = format!("✓ Agent {} is now {}", key, status.lifecycle);
            if status.enabled {
                println!("{}", message.green());
            } else {
                println!("{}", message.yellow());
            }
            Ok(())
        }
        AgentsCommand::Catalog { .. } => Ok(()),
    }
}

/// Adds the CLI-side fix for errors an operator can resolve in config.
fn explain(err: ActionError) -> anyhow::Error {
    match err {
        ActionError::Unauthenticated { .. } => {
            anyhow::anyhow!("{}. Set spec.auth.operator in the configuration file", err)
        }
        ActionError::MissingOrganization => {
            anyhow::anyhow!("{}. Set spec.auth.operator.organization_id", err)
        }
        other => other.into(),
    }
}

/// Inline JSON wins over a payload file; neither means no payload.
pub fn parse_payload(inline: Option<&str>, file: Option<&PathBuf>) -> Result<Option<Value>> {
    if let Some(raw) = inline {
        let value = serde_json::from_str(raw).context("--payload is not valid JSON")?;
        return Ok(Some(value));
    }
    if let Some(path) = file {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read payload file {:?}", path))?;
        let value = serde_json::from_str(&raw).with_context(|| format!("Payload file {:?} is not valid JSON", path))?;
        return Ok(Some(value));
    }
    Ok(None)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_agents(agents: &[AgentView]) {
    if agents.is_empty() {
        println!("{}", "No agents registered".yellow());
        return;
    }

    println!("{:<24} {:<10} {:<10} {:>10}  {}", "KEY", "CATEGORY", "STATE", "IMPACT", "LAST SUMMARY");
    for agent in agents {
        let state = if agent.status.enabled() {
            "enabled".green()
        } else {
            "disabled".red()
        };
        let governed = if agent.status.is_governed() { "*" } else { " " };
        println!(
            "{:<24} {:<10} {:<9}{} {:>10}  {}",
            agent.meta.key.as_str().bold(),
            agent.meta.category,
            state,
            governed,
            format!("${:.0}", agent.status.status.impact),
            agent.status.status.last_summary.as_deref().unwrap_or("-").dimmed()
        );
    }
    println!();
    println!("{}", "* state set by organization governance".dimmed());
}

fn print_run(key: &AgentKey, result: &AgentRunResult) {
    println!(
        "{}",
        format!("✓ {}: {}", key, result.local.summary.as_deref().unwrap_or("Completed")).green()
    );

    for warning in &result.local.warnings {
        println!("{}", format!("⚠ {}", warning).yellow());
    }

    if let Some(data) = &result.local.data {
        if let Ok(pretty) = serde_json::to_string_pretty(data) {
            println!("{}", pretty);
        }
    }

    match &result.remote {
        RemoteRunOutcome::Mirrored { run_id, .. } => {
            println!("{}", format!("Remote run: {}", run_id.as_deref().unwrap_or("(no id)")).dimmed())
        }
        RemoteRunOutcome::Failed { reason } => println!("{}", format!("⚠ Remote run failed: {}", reason).yellow()),
        RemoteRunOutcome::Disabled => {}
    }
}

fn print_logs(logs: &[RunLogEntry]) {
    if logs.is_empty() {
        println!("{}", "No runs in this process. Use `revos agents history` for persisted runs.".yellow());
        return;
    }

    for entry in logs {
        let line = match &entry.outcome {
            RunOutcome::Completed { output } => output.status_summary().normal(),
            RunOutcome::Failed { reason } => format!("Failed: {}", reason).red(),
        };
        println!("{}  {}", entry.ts.to_rfc3339().dimmed(), line);
    }
}

fn print_history(runs: &[AgentRunRecord]) {
    if runs.is_empty() {
        println!("{}", "No persisted runs".yellow());
        return;
    }

    for run in runs {
        println!(
            "{}  {:<12} {}",
            run.created_at.to_rfc3339().dimmed(),
            run.user_id,
            run.summary.as_deref().unwrap_or("-")
        );
    }
}

fn catalog(json: bool) -> Result<()> {
    let agents = builtin_agents();
    if json {
        let metas: Vec<_> = agents.iter().map(|a| &a.meta).collect();
        return print_json(&metas);
    }

    let mut category = None;
    for agent in &agents {
        if category != Some(agent.meta.category) {
            category = Some(agent.meta.category);
            println!();
            println!("{}", format!("{}:", agent.meta.category).bold());
        }
        let auto = if agent.meta.auto_runnable { " (auto)" } else { "" };
        println!(
            "  {:<24} {}{}",
            agent.meta.key.as_str(),
            agent.meta.description,
            auto.cyan()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inline_payload() {
        let payload = parse_payload(Some(r#"{"clientId":"acme-co"}"#), None).unwrap();
        assert_eq!(payload, Some(json!({ "clientId": "acme-co" })));
    }

    #[test]
    fn test_parse_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, r#"{"monthlyRevenue": 120000}"#).unwrap();

        let payload = parse_payload(None, Some(&path)).unwrap();
        assert_eq!(payload, Some(json!({ "monthlyRevenue": 120000 })));
    }

    #[test]
    fn test_parse_payload_rejects_bad_json() {
        assert!(parse_payload(Some("{oops"), None).is_err());
        assert_eq!(parse_payload(None, None).unwrap(), None);
    }

    #[test]
    fn test_explain_points_at_operator_config() {
        let err = explain(ActionError::MissingOrganization);
        assert!(err.to_string().contains("organization_id"));
    }
}
