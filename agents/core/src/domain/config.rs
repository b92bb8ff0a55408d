// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

// Console Configuration Types
//
// Defines the configuration schema for a RevOS agents host, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Storage backend for governance and run records
// - Serverless function endpoint used for run mirroring and analytics
// - Bus sizing (run log capacity, default log page)
// - Operator identity and API tokens
// - HTTP server binding

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::auth::AuthContext;
use crate::domain::governance::OrganizationId;
use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::run_log::{DEFAULT_LOG_CAPACITY, DEFAULT_LOG_LIMIT};

pub const API_VERSION: &str = "revos.io/v1";
pub const KIND: &str = "ConsoleConfig";
pub const CONFIG_PATH_ENV: &str = "REVOS_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "revos-config.yaml";

/// Top-level Kubernetes-style console configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// API version (must be "revos.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ConsoleConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: ConsoleConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfigSpec {
    #[serde(default)]
    pub storage: StorageBackend,

    #[serde(default)]
    pub functions: FunctionsConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Hosted function endpoint (Supabase edge functions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Whether runs are mirrored and analytics emitted at all
    #[serde(default)]
    pub enabled: bool,

    /// Base URL, e.g. `https://<project>.supabase.co/functions/v1`
    #[serde(default)]
    pub base_url: String,

    /// Service key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            service_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FunctionsConfig {
    /// Service key with `env:` indirection resolved.
    pub fn resolved_service_key(&self) -> Option<String> {
        resolve_secret(self.service_key.as_deref()?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    #[serde(default = "default_log_limit")]
    pub default_log_limit: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            default_log_limit: DEFAULT_LOG_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity used by CLI commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<IdentityConfig>,

    /// Bearer tokens accepted by the HTTP API
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl IdentityConfig {
    pub fn to_auth_context(&self) -> AuthContext {
        AuthContext::new(
            self.user_id.clone(),
            self.organization_id.clone().map(OrganizationId::new),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token value (supports "env:VAR_NAME")
    pub token: String,
    #[serde(flatten)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

fn default_log_limit() -> usize {
    DEFAULT_LOG_LIMIT
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Resolves `env:VAR_NAME` references; other values are returned as-is.
pub fn resolve_secret(value: &str) -> Option<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
        None if value.is_empty() => None,
        None => Some(value.to_string()),
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "revos-agents".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: ConsoleConfigSpec::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. REVOS_CONFIG_PATH environment variable
    /// 2. ./revos-config.yaml (working directory)
    /// 3. ~/.revos/config.yaml (user home)
    /// 4. /etc/revos/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from(format!("./{CONFIG_FILE_NAME}"));
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".revos").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/revos/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load from an explicit path (failing if unreadable), else from the
    /// discovered path, else defaults. Environment overrides apply last.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REVOS_DATABASE_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: REVOS_DATABASE_URL");
                let max_connections = match &self.spec.storage {
                    StorageBackend::Postgres(pg) => pg.max_connections,
                    StorageBackend::InMemory => 5,
                };
                self.spec.storage = StorageBackend::Postgres(PostgresConfig {
                    connection_string: url,
                    max_connections,
                });
            }
        }

        if let Ok(url) = std::env::var("SUPABASE_FUNCTIONS_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: SUPABASE_FUNCTIONS_URL");
                self.spec.functions.base_url = url;
                self.spec.functions.enabled = true;
            }
        }

        if std::env::var("SUPABASE_SERVICE_ROLE_KEY").is_ok() && self.spec.functions.service_key.is_none() {
            self.spec.functions.service_key = Some("env:SUPABASE_SERVICE_ROLE_KEY".to_string());
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if let StorageBackend::Postgres(pg) = &self.spec.storage {
            if pg.connection_string.is_empty() {
                anyhow::bail!("spec.storage.connection_string cannot be empty for postgres storage");
            }
            if pg.max_connections == 0 {
                anyhow::bail!("spec.storage.max_connections must be at least 1");
            }

            // agent_runs.user_id and agent_definitions.created_by are uuid columns
            if let Some(operator) = &self.spec.auth.operator {
                require_uuid_identity("spec.auth.operator", operator)?;
            }
            for (index, token) in self.spec.auth.tokens.iter().enumerate() {
                require_uuid_identity(&format!("spec.auth.tokens[{}]", index), &token.identity)?;
            }
        }

        if self.spec.functions.enabled && self.spec.functions.base_url.is_empty() {
            anyhow::bail!("spec.functions.base_url is required when functions are enabled");
        }

        if self.spec.bus.log_capacity == 0 {
            anyhow::bail!("spec.bus.log_capacity must be at least 1");
        }

        if let Some(operator) = &self.spec.auth.operator {
            if operator.user_id.is_empty() {
                anyhow::bail!("spec.auth.operator.user_id cannot be empty");
            }
        }

        for (index, token) in self.spec.auth.tokens.iter().enumerate() {
            if token.token.is_empty() {
                anyhow::bail!("spec.auth.tokens[{}].token cannot be empty", index);
            }
            if token.identity.user_id.is_empty() {
                anyhow::bail!("spec.auth.tokens[{}].user_id cannot be empty", index);
            }
        }

        Ok(())
    }
}

fn require_uuid_identity(path: &str, identity: &IdentityConfig) -> anyhow::Result<()> {
    if uuid::Uuid::parse_str(identity.user_id.trim()).is_err() {
        anyhow::bail!("{}.user_id must be a UUID with postgres storage, got '{}'", path, identity.user_id);
    }
    if let Some(org) = &identity.organization_id {
        if uuid::Uuid::parse_str(org.trim()).is_err() {
            anyhow::bail!("{}.organization_id must be a UUID with postgres storage, got '{}'", path, org);
        }
    }
    Ok(())
}
