// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! # RevOS Agents CLI
//!
//! The `revos` binary drives the agent console either directly, acting as
//! the configured operator, or by serving the HTTP API.
//!
//! ## Commands
//!
//! - `revos agents list|run|logs|history|toggle|catalog` - Agent operations
//! - `revos serve` - Run the HTTP API until SIGINT/SIGTERM
//! - `revos config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use revos_agents::commands::{self, AgentsCommand, ConfigCommand};

/// RevOS agents console
#[derive(Parser)]
#[command(name = "revos")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "REVOS_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "REVOS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent operations
    #[command(name = "agents")]
    Agents {
        #[command(subcommand)]
        command: AgentsCommand,
    },

    /// Serve the agents HTTP API
    #[command(name = "serve")]
    Serve {
        /// Bind host (default: spec.server.host)
        #[arg(long, env = "REVOS_HOST")]
        host: Option<String>,

        /// Bind port (default: spec.server.port)
        #[arg(long, env = "REVOS_PORT")]
        port: Option<u16>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Agents { command }) => commands::agents::handle_command(command, cli.config).await,
        Some(Commands::Serve { host, port }) => commands::serve::run(cli.config, host, port).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
