// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring
//!
//! Builds the bus, repositories and actions facade from a [`ConsoleConfig`].
//! CLI commands and `revos serve` share this; they differ only in the
//! [`AuthProvider`] they pass in.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use revos_core::application::actions::AgentActions;
use revos_core::application::bus::AgentBus;
use revos_core::application::catalog::builtin_agents;
use revos_core::application::governance::GovernanceLoader;
use revos_core::application::repository_factory::{create_agent_run_repository, create_governance_repository};
use revos_core::domain::auth::AuthProvider;
use revos_core::domain::config::ConsoleConfig;
use revos_core::domain::repository::StorageBackend;
use revos_core::infrastructure::auth::{StaticAuthProvider, TokenAuthProvider};
use revos_core::infrastructure::db::Database;
use revos_core::infrastructure::{EdgeFunctionsClient, EventBus};

/// Who the facade authenticates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// The configured `spec.auth.operator`, for CLI commands
    Operator,
    /// Bearer tokens from `spec.auth.tokens`, for the HTTP API
    Tokens,
}

pub struct ConsoleServices {
    pub config: ConsoleConfig,
    pub bus: Arc<AgentBus>,
    pub events: EventBus,
    pub actions: Arc<AgentActions>,
}

impl ConsoleServices {
    pub async fn load(config_path: Option<PathBuf>, mode: AuthMode) -> Result<Self> {
        let config = ConsoleConfig::load_or_default(config_path).context("Failed to load configuration")?;
        Self::build(config, mode).await
    }

    pub async fn build(config: ConsoleConfig, mode: AuthMode) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let events = EventBus::with_default_capacity();
        let bus = Arc::new(AgentBus::from_config(&config.spec.bus).with_events(events.clone()));
        bus.register_all(builtin_agents());

        let database = match &config.spec.storage {
            StorageBackend::Postgres(pg) => Some(Database::from_config(pg).await?),
            StorageBackend::InMemory => None,
        };
        let governance = create_governance_repository(&config.spec.storage, database.as_ref())
            .context("Failed to create governance repository")?;
        let runs = create_agent_run_repository(&config.spec.storage, database.as_ref())
            .context("Failed to create agent run repository")?;
        let loader = Arc::new(GovernanceLoader::new(governance, runs));

        let auth: Arc<dyn AuthProvider> = match mode {
            AuthMode::Operator => Arc::new(StaticAuthProvider::from_config(&config.spec.auth)),
            AuthMode::Tokens => Arc::new(TokenAuthProvider::from_config(&config.spec.auth)),
        };

        let mut actions = AgentActions::new(bus.clone(), auth, loader);
        if config.spec.functions.enabled {
            let client = Arc::new(
                EdgeFunctionsClient::from_config(&config.spec.functions)
                    .context("Failed to create edge functions client")?,
            );
            info!(base_url = %client.base_url(), "Edge functions enabled");
            actions = actions.with_remote_runner(client.clone()).with_analytics(client);
        }

        info!(agents = bus.len(), "Console services ready");

        Ok(Self {
            config,
            bus,
            events,
            actions: Arc::new(actions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revos_core::domain::agent::AgentKey;
    use revos_core::domain::auth::Credentials;
    use revos_core::domain::config::IdentityConfig;

    #[tokio::test]
    async fn test_build_registers_builtin_catalogue() {
        let services = ConsoleServices::build(ConsoleConfig::default(), AuthMode::Operator)
            .await
            .unwrap();
        assert_eq!(services.bus.len(), 16);
        assert!(services.bus.contains(&AgentKey::new("revenue-clarity")));
    }

    #[tokio::test]
    async fn test_operator_mode_runs_as_configured_identity() {
        let mut config = ConsoleConfig::default();
        config.spec.auth.operator = Some(IdentityConfig {
            user_id: "ops".to_string(),
            organization_id: Some("org-1".to_string()),
        });
        let services = ConsoleServices::build(config, AuthMode::Operator).await.unwrap();

        let result = services
            .actions
            .action_run_agent(&Credentials::anonymous(), &AgentKey::new("collections"), None)
            .await
            .unwrap();
        assert_eq!(result.local.summary.as_deref(), Some("Dunning step 2 sent; $1.8k likely."));
    }

    #[tokio::test]
    async fn test_token_mode_rejects_anonymous() {
        let services = ConsoleServices::build(ConsoleConfig::default(), AuthMode::Tokens)
            .await
            .unwrap();
        assert!(services.actions.action_list_agents(&Credentials::anonymous()).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = ConsoleConfig::default();
        config.spec.functions.enabled = true;
        assert!(ConsoleServices::build(config, AuthMode::Operator).await.is_err());
    }
}
