// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use revos_core::domain::config::{resolve_secret, ConsoleConfig, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use revos_core::domain::repository::StorageBackend;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./revos-config.yaml)
        #[arg(short, long, default_value = "./revos-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(output, examples, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ConsoleConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./{}", CONFIG_FILE_NAME);
        println!("  4. ~/.revos/config.yaml");
        println!("  5. /etc/revos/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Storage:".bold());
    match &config.spec.storage {
        StorageBackend::InMemory => println!("  Backend: in-memory (governance and runs are not persisted)"),
        StorageBackend::Postgres(pg) => {
            println!("  Backend: postgres");
            println!("  Max connections: {}", pg.max_connections);
        }
    }
    println!();

    println!("{}", "Edge Functions:".bold());
    if config.spec.functions.enabled {
        println!("  Base URL: {}", config.spec.functions.base_url);
        println!(
            "  Service key: {}",
            if config.spec.functions.resolved_service_key().is_some() {
                "set".green()
            } else {
                "missing".yellow()
            }
        );
        println!("  Timeout: {}s", config.spec.functions.timeout_secs);
    } else {
        println!("  {}", "disabled".dimmed());
    }
    println!();

    println!("{}", "Bus:".bold());
    println!("  Log capacity: {}", config.spec.bus.log_capacity);
    println!("  Default log limit: {}", config.spec.bus.default_log_limit);
    println!();

    println!("{}", "Auth:".bold());
    match &config.spec.auth.operator {
        Some(operator) => println!(
            "  Operator: {} (organization: {})",
            operator.user_id,
            operator.organization_id.as_deref().unwrap_or("none")
        ),
        None => println!("  Operator: {}", "(not set)".dimmed()),
    }
    let usable = config
        .spec
        .auth
        .tokens
        .iter()
        .filter(|t| resolve_secret(&t.token).is_some())
        .count();
    println!("  API tokens: {} ({} resolvable)", config.spec.auth.tokens.len(), usable);
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", config.spec.server.host, config.spec.server.port);

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ConsoleConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

pub fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

fn generate(output: PathBuf, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{:?} already exists. Pass --force to overwrite", output);
    }

    std::fs::write(&output, sample_config(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse_and_validate() {
        for with_examples in [false, true] {
            let config = ConsoleConfig::from_yaml_str(sample_config(with_examples)).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        generate(path.clone(), false, false).unwrap();
        assert!(generate(path.clone(), true, false).is_err());
        generate(path.clone(), true, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, sample_config(true));
    }

    #[test]
    fn test_validate_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "apiVersion: revos.io/v1\nkind: NodeConfig\nmetadata:\n  name: x\n").unwrap();
        assert!(validate(Some(path)).is_err());
    }
}
