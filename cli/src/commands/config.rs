// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use agentnet_core::domain::network_config::{NetworkConfigManifest, StorageBackendKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./agentnet-config.yaml)
        #[arg(short, long, default_value = "./agentnet-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = NetworkConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. AGENTNET_CONFIG_PATH: {}",
            std::env::var("AGENTNET_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./agentnet-config.yaml");
        println!("  4. ~/.agentnet/config.yaml");
        println!("  5. /etc/agentnet/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!("  RPC path: {}", spec.server.rpc_path);
    println!("  Request timeout: {}ms", spec.server.request_timeout_ms);
    println!();

    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageBackendKind::InMemory => println!("  Backend: in-memory"),
        StorageBackendKind::Postgres => {
            println!("  Backend: postgres");
            if let Some(pg) = &spec.storage.postgres {
                // The URL may carry credentials
                let url = if pg.url.starts_with("env:") { pg.url.as_str() } else { "(set)" };
                println!("  URL: {}", url);
                println!("  Schema: {}", pg.schema);
                println!("  Max connections: {}", pg.max_connections);
            }
        }
    }
    println!();

    println!("{}", "Registry:".bold());
    println!("  Probe timeout: {}ms", spec.registry.probe_timeout_ms);
    println!("  Unknown agents: {:?}", spec.registry.unknown_agents);
    println!();

    println!("{}", "Pagination:".bold());
    println!("  Default limit: {}", spec.pagination.default_limit);
    println!("  Max limit: {}", spec.pagination.max_limit);
    println!();

    println!("{}", "Observability:".bold());
    println!(
        "  Logging: {} ({:?})",
        spec.observability.logging.level, spec.observability.logging.format
    );
    if spec.observability.metrics.enabled {
        println!("  Metrics: {}", spec.observability.metrics.path);
    } else {
        println!("  Metrics: {}", "disabled".dimmed());
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NetworkConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;
    config
        .spec
        .storage
        .backend()
        .context("Storage configuration cannot be resolved")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let sample = if with_examples { EXAMPLES_TEMPLATE } else { MINIMAL_TEMPLATE };

    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
