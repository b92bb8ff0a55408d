// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Run Repository
//!
//! Audit rows for console-side runs in `agent_runs`. The hosted `agent-run`
//! function writes its own rows into the same table; both are scoped by
//! `organization_id`.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::agent::AgentKey;
use crate::domain::governance::{AgentRunRecord, OrganizationId};
use crate::domain::repository::{AgentRunRepository, RepositoryError};
use crate::infrastructure::repositories::parse_uuid;

pub struct PostgresAgentRunRepository {
    pool: PgPool,
}

impl PostgresAgentRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRunRepository for PostgresAgentRunRepository {
    async fn insert(&self, record: &AgentRunRecord) -> Result<(), RepositoryError> {
        let organization_id = parse_uuid("organization_id", record.organization_id.as_str())?;
        let user_id = parse_uuid("user_id", &record.user_id)?;
        let violations = serde_json::to_value(&record.guardrail_violations)?;

        // organization_id uuid, user_id uuid, input/output jsonb,
        // guardrail_violations jsonb, created_at timestamptz
        sqlx::query(
            r#"
            INSERT INTO agent_runs (
                agent_key, organization_id, user_id, input, output,
                summary, guardrail_violations, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.agent_key.as_str())
        .bind(organization_id)
        .bind(user_id)
        .bind(&record.run_input)
        .bind(&record.run_output)
        .bind(&record.summary)
        .bind(violations)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert agent run: {}", e)))?;

        Ok(())
    }

    async fn find_recent(
        &self,
        organization_id: &OrganizationId,
        agent_key: &AgentKey,
        limit: usize,
    ) -> Result<Vec<AgentRunRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                agent_key, organization_id::text AS organization_id, user_id::text AS user_id,
                input, output, summary, guardrail_violations, created_at
            FROM agent_runs
            WHERE organization_id::text = $1 AND agent_key = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(organization_id.as_str())
        .bind(agent_key.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let input: Option<serde_json::Value> = row.get("input");
            let output: Option<serde_json::Value> = row.get("output");
            let violations: Option<serde_json::Value> = row.get("guardrail_violations");
            let guardrail_violations: Vec<String> = match violations {
                Some(value) => serde_json::from_value(value)?,
                None => Vec::new(),
            };

            records.push(AgentRunRecord {
                agent_key: AgentKey::new(row.get::<String, _>("agent_key")),
                organization_id: OrganizationId::new(row.get::<String, _>("organization_id")),
                user_id: row.get("user_id"),
                run_input: input.unwrap_or_default(),
                run_output: output.unwrap_or_default(),
                summary: row.get("summary"),
                guardrail_violations,
                created_at: row.get("created_at"),
            });
        }

        Ok(records)
    }
}
