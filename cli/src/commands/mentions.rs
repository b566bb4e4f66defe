// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;

use agentnet_sdk::AgentNetworkClient;

/// Collect and print the threads `agent` was mentioned in. Each mention is
/// delivered once, so running this consumes them.
pub async fn handle_command(agent: &str, client: &AgentNetworkClient) -> Result<()> {
    let thread_ids = client
        .is_mentioned_once(agent)
        .await
        .with_context(|| format!("Failed to fetch mentions for {}", agent))?;

    if thread_ids.is_empty() {
        println!("{}", format!("No pending mentions for {}", agent).yellow());
        return Ok(());
    }

    println!("{} mentioned in {} thread(s):", agent.bold(), thread_ids.len());
    for id in thread_ids {
        println!("  #{}", id);
    }
    Ok(())
}
