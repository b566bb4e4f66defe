// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptive part of a directory entry, as supplied by the agent on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentInfo {
    /// Directory key, unique across the mesh
    pub name: String,

    /// Free-form role label (e.g. "planner")
    pub role: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl AgentInfo {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A registered agent endpoint: the directory entry keyed by `info.name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRuntime {
    pub info: AgentInfo,

    /// Network address the agent serves on (`host:port`)
    pub addr: String,

    pub registered_at: DateTime<Utc>,

    /// Set by the last successful liveness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_live_at: Option<DateTime<Utc>>,
}

impl AgentRuntime {
    pub fn new(addr: impl Into<String>, info: AgentInfo) -> Self {
        Self {
            info,
            addr: addr.into(),
            registered_at: Utc::now(),
            last_live_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn mark_live(&mut self, at: DateTime<Utc>) {
        self.last_live_at = Some(at);
    }
}

/// What `GetAgentRuntimeInfo` does with names that are not in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownAgentPolicy {
    /// Leave unknown names out of the snapshot
    #[default]
    Omit,
    /// Fail the whole call with NotFound
    Fail,
}
