// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use agentnet_sdk::{AgentInfo, AgentNetworkClient, AgentRuntimeInfo};

use super::parse_key_value;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List every registered agent
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show directory entries for the named agents
    Show {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Register (or re-register) an agent at an address
    Register {
        /// Address the agent serves on (host:port)
        #[arg(long)]
        addr: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        role: String,

        /// Metadata entry, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    /// Probe the health endpoint of the named agents
    Check {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Remove agents from the directory
    Deregister {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
}

pub async fn handle_command(command: AgentCommand, client: &AgentNetworkClient) -> Result<()> {
    match command {
        AgentCommand::List { json } => {
            let agents = client
                .get_all_agent_runtime_info()
                .await
                .context("Failed to list agents")?;
            print_agents(&agents, json)
        }
        AgentCommand::Show { names, json } => {
            let agents = client
                .get_agent_runtime_info(&names)
                .await
                .context("Failed to look up agents")?;
            print_agents(&agents, json)
        }
        AgentCommand::Register {
            addr,
            name,
            role,
            metadata,
        } => {
            let info = AgentInfo {
                name: name.clone(),
                role,
                metadata: metadata.into_iter().collect(),
            };
            client
                .register_agent(&addr, vec![info])
                .await
                .with_context(|| format!("Failed to register {}", name))?;
            println!("{}", format!("✓ Registered {} at {}", name, addr).green());
            Ok(())
        }
        AgentCommand::Check { names } => {
            client.check_live(&names).await.context("Liveness check failed")?;
            println!("{}", format!("✓ {} agent(s) live", names.len()).green());
            Ok(())
        }
        AgentCommand::Deregister { names } => {
            client
                .deregister_agent(&names)
                .await
                .context("Failed to deregister agents")?;
            println!("{}", format!("✓ Deregistered {}", names.join(", ")).green());
            Ok(())
        }
    }
}

fn print_agents(agents: &[AgentRuntimeInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(agents)?);
        return Ok(());
    }

    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", agents.len());
    println!("{:<24} {:<16} {}", "NAME", "ROLE", "ADDRESS");
    for agent in agents {
        println!(
            "{:<24} {:<16} {}",
            agent.info.name.bold(),
            agent.info.role,
            agent.addr
        );
    }

    Ok(())
}
