// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # agentnet
//!
//! The `agentnet` binary runs the agent directory and thread service and
//! talks to a running instance.
//!
//! ## Commands
//!
//! - `agentnet serve` - Run the JSON-RPC server
//! - `agentnet config show|validate|generate` - Configuration management
//! - `agentnet agent list|show|check|deregister` - Directory operations
//! - `agentnet thread create|list|show|messages|post|invite` - Thread operations
//! - `agentnet mentions <AGENT>` - Drain pending mentions for an agent

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use agentnet_cli::commands::{self, AgentCommand, ConfigCommand, ThreadCommand};
use agentnet_cli::logging::init_logging;
use agentnet_cli::server;
use agentnet_core::domain::network_config::{LogFormat, NetworkConfigManifest};
use agentnet_sdk::AgentNetworkClient;

/// agentnet - agent directory and thread coordination service
#[derive(Parser)]
#[command(name = "agentnet")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "AGENTNET_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint used by client commands
    #[arg(
        long,
        global = true,
        env = "AGENTNET_ENDPOINT",
        default_value = "http://127.0.0.1:8080/rpc"
    )]
    endpoint: String,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "AGENTNET_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-RPC server
    #[command(name = "serve")]
    Serve {
        /// Listen port (overrides spec.server.port)
        #[arg(long, env = "AGENTNET_PORT")]
        port: Option<u16>,

        /// Bind address (overrides spec.server.bind_address)
        #[arg(long, env = "AGENTNET_HOST")]
        host: Option<String>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Agent directory operations
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Thread operations
    #[command(name = "thread")]
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },

    /// Drain pending mentions for an agent
    #[command(name = "mentions")]
    Mentions {
        #[arg(value_name = "AGENT")]
        agent: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, host }) => {
            let mut config = NetworkConfigManifest::load_or_default(cli.config)
                .context("Failed to load configuration")?;
            if let Some(port) = port {
                config.spec.server.port = port;
            }
            if let Some(host) = host {
                config.spec.server.bind_address = host;
            }

            let logging = &config.spec.observability.logging;
            init_logging(cli.log_level.as_deref().unwrap_or(&logging.level), logging.format)?;
            server::serve(config).await
        }
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Text)?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Agent { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Text)?;
            commands::agent::handle_command(command, &AgentNetworkClient::new(cli.endpoint)).await
        }
        Some(Commands::Thread { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Text)?;
            commands::thread::handle_command(command, &AgentNetworkClient::new(cli.endpoint)).await
        }
        Some(Commands::Mentions { agent }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Text)?;
            commands::mentions::handle_command(&agent, &AgentNetworkClient::new(cli.endpoint)).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}
