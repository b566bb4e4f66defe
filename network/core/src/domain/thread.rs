// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Threads and messages
//!
//! A thread is a participant-scoped conversation; messages are appended to it
//! and never rewritten. Both carry surrogate ids drawn from monotonic
//! sequences, and message ids double as pagination cursors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub instruction: String,
    /// Agent names; a set, kept in first-seen order
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }

    /// Adds `name` to the participant set. Returns false if it was already present.
    pub fn add_participant(&mut self, name: &str) -> bool {
        if self.has_participant(name) {
            return false;
        }
        self.participants.push(name.to_string());
        true
    }
}

/// Input for thread creation; the repository assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewThread {
    pub instruction: String,
    pub participants: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl NewThread {
    pub fn new(instruction: impl Into<String>, participants: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(participants.len());
        for p in participants {
            if !unique.contains(&p) {
                unique.push(p);
            }
        }
        Self {
            instruction: instruction.into(),
            participants: unique,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    /// Agent name or user identifier
    pub sender: String,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured body of a message. Stored as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// A tool invocation recorded in a message. Arguments and result are opaque
/// JSON and are never interpreted by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Direction of a message page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageOrder {
    /// Ascending by id
    #[default]
    Oldest,
    /// Descending by id
    Latest,
}

impl MessageOrder {
    /// Parses the wire value. An empty string selects `Oldest`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "oldest" => Some(Self::Oldest),
            "latest" => Some(Self::Latest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oldest => "oldest",
            Self::Latest => "latest",
        }
    }
}

/// Cursor for the page that follows `page`: the id of its last item, or 0.
pub fn next_thread_cursor(page: &[Thread]) -> ThreadId {
    page.last().map(|t| t.id).unwrap_or_default()
}
