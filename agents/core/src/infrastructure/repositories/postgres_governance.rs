// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Governance Repository
//!
//! `GovernanceRepository` backed by `agent_definitions`, with prompts and
//! guardrails aggregated from `agent_prompts` / `agent_guardrails` into one
//! JSON column each so a lookup is a single round trip.
//!
//! Null columns take the console defaults: lifecycle `active`, guardrail
//! severity `medium`.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::agent::{AgentKey, LIFECYCLE_ACTIVE};
use crate::domain::governance::{
    AgentGovernanceRecord, AgentGuardrail, AgentPrompt, GovernanceRow, GovernanceToggle, OrganizationId,
    DEFAULT_GUARDRAIL_SEVERITY,
};
use crate::domain::repository::{GovernanceRepository, RepositoryError};
use crate::infrastructure::repositories::parse_uuid;

pub struct PostgresGovernanceRepository {
    pool: PgPool,
}

impl PostgresGovernanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Deserialize)]
struct PromptRow {
    id: String,
    name: Option<String>,
    role: Option<String>,
    content: Option<String>,
    lifecycle_status: Option<String>,
}

impl From<PromptRow> for AgentPrompt {
    fn from(row: PromptRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            role: row.role.unwrap_or_default(),
            content: row.content.unwrap_or_default(),
            lifecycle_status: row.lifecycle_status.unwrap_or_else(|| LIFECYCLE_ACTIVE.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GuardrailRow {
    id: String,
    rule: Option<String>,
    severity: Option<String>,
    remediation: Option<String>,
    lifecycle_status: Option<String>,
}

impl From<GuardrailRow> for AgentGuardrail {
    fn from(row: GuardrailRow) -> Self {
        Self {
            id: row.id,
            rule: row.rule.unwrap_or_default(),
            severity: row.severity.unwrap_or_else(|| DEFAULT_GUARDRAIL_SEVERITY.to_string()),
            remediation: row.remediation,
            lifecycle_status: row.lifecycle_status.unwrap_or_else(|| LIFECYCLE_ACTIVE.to_string()),
        }
    }
}

fn row_to_governance(row: &sqlx::postgres::PgRow) -> Result<GovernanceRow, RepositoryError> {
    let prompts: Vec<PromptRow> = serde_json::from_value(row.get("prompts"))?;
    let guardrails: Vec<GuardrailRow> = serde_json::from_value(row.get("guardrails"))?;
    let lifecycle_status: Option<String> = row.get("lifecycle_status");
    let auto_runnable: Option<bool> = row.get("auto_runnable");

    let record = AgentGovernanceRecord {
        agent_key: AgentKey::new(row.get::<String, _>("agent_key")),
        definition_id: row.get("id"),
        lifecycle_status: lifecycle_status.unwrap_or_else(|| LIFECYCLE_ACTIVE.to_string()),
        auto_runnable: auto_runnable.unwrap_or(false),
        display_name: row.get("display_name"),
        description: row.get("description"),
        definition: row.get("definition"),
        prompts: prompts.into_iter().map(AgentPrompt::from).collect(),
        guardrails: guardrails.into_iter().map(AgentGuardrail::from).collect(),
    };

    Ok(GovernanceRow {
        organization_id: OrganizationId::new(row.get::<String, _>("organization_id")),
        version: row.get::<Option<i32>, _>("version").unwrap_or(0),
        record,
    })
}

#[async_trait]
impl GovernanceRepository for PostgresGovernanceRepository {
    async fn find_for_keys(
        &self,
        organization_id: &OrganizationId,
        agent_keys: &[AgentKey],
    ) -> Result<Vec<GovernanceRow>, RepositoryError> {
        let keys: Vec<String> = agent_keys.iter().map(|k| k.0.clone()).collect();

        let rows = sqlx::query(
            r#"
            SELECT
                d.id::text AS id,
                d.organization_id::text AS organization_id,
                d.agent_key,
                d.version,
                d.lifecycle_status,
                d.auto_runnable,
                d.display_name,
                d.description,
                d.definition,
                COALESCE((
                    SELECT json_agg(json_build_object(
                        'id', p.id::text,
                        'name', p.name,
                        'role', p.role,
                        'content', p.content,
                        'lifecycle_status', p.lifecycle_status
                    ))
                    FROM agent_prompts p
                    WHERE p.agent_definition_id = d.id
                ), '[]'::json) AS prompts,
                COALESCE((
                    SELECT json_agg(json_build_object(
                        'id', g.id::text,
                        'rule', g.rule,
                        'severity', g.severity,
                        'remediation', g.remediation,
                        'lifecycle_status', g.lifecycle_status
                    ))
                    FROM agent_guardrails g
                    WHERE g.agent_definition_id = d.id
                ), '[]'::json) AS guardrails
            FROM agent_definitions d
            WHERE d.organization_id::text = $1
              AND d.agent_key = ANY($2)
            ORDER BY d.version DESC
            "#,
        )
        .bind(organization_id.as_str())
        .bind(&keys)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to load agent governance: {}", e)))?;

        rows.iter().map(row_to_governance).collect()
    }

    async fn apply_toggle(&self, toggle: &GovernanceToggle) -> Result<(), RepositoryError> {
        let organization_id = parse_uuid("organization_id", toggle.organization_id.as_str())?;
        let created_by = parse_uuid("created_by", &toggle.updated_by)?;

        let mut tx = self.pool.begin().await?;

        let latest = sqlx::query(
            r#"
            SELECT id
            FROM agent_definitions
            WHERE organization_id = $1 AND agent_key = $2
            ORDER BY version DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .bind(toggle.agent_key.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        match latest {
            Some(row) => {
                let id: uuid::Uuid = row.get("id");
                sqlx::query(
                    r#"
                    UPDATE agent_definitions
                    SET lifecycle_status = $1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(toggle.lifecycle_status())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(format!("Failed to update agent definition: {}", e)))?;
            }
            None => {
                // id, organization_id and created_by are uuid columns
                sqlx::query(
                    r#"
                    INSERT INTO agent_definitions (
                        id, organization_id, agent_key, version, lifecycle_status, auto_runnable, created_by
                    )
                    VALUES ($1, $2, $3, 1, $4, FALSE, $5)
                    "#,
                )
                .bind(uuid::Uuid::new_v4())
                .bind(organization_id)
                .bind(toggle.agent_key.as_str())
                .bind(toggle.lifecycle_status())
                .bind(created_by)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(format!("Failed to insert agent definition: {}", e)))?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_defaults() {
        let row: PromptRow = serde_json::from_value(json!({
            "id": "p1", "name": "System", "role": "system", "content": "Be brief", "lifecycle_status": null
        }))
        .unwrap();
        let prompt = AgentPrompt::from(row);
        assert_eq!(prompt.lifecycle_status, "active");
        assert_eq!(prompt.content, "Be brief");
    }

    #[test]
    fn test_guardrail_defaults() {
        let row: GuardrailRow = serde_json::from_value(json!({
            "id": "g1", "rule": "No discounts above 12%", "severity": null,
            "remediation": null, "lifecycle_status": null
        }))
        .unwrap();
        let guardrail = AgentGuardrail::from(row);
        assert_eq!(guardrail.severity, "medium");
        assert_eq!(guardrail.lifecycle_status, "active");
        assert!(guardrail.remediation.is_none());
    }
}
