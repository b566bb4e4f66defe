// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the agentnet CLI

pub mod agent;
pub mod config;
pub mod mentions;
pub mod thread;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::thread::ThreadCommand;

/// Parse a `KEY=VALUE` argument.
pub(crate) fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
