// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into the PostgreSQL repositories. Only opened when the
//! `storage` section of `revos-config.yaml` selects `postgres`.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::repository::PostgresConfig;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn from_config(config: &PostgresConfig) -> Result<Self> {
        Self::new(&config.connection_string, config.max_connections).await
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
