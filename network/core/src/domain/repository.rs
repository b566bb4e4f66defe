// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the two aggregates the network owns, defined in
//! the domain layer and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AgentRepository` | `AgentRuntime` | in-memory, `PostgresAgentRepository` |
//! | `ThreadRepository` | `Thread` + `Message` | in-memory, `PostgresThreadRepository` |
//!
//! Every method receives the caller's [`CallContext`]. Postgres implementations
//! resolve their tenant-scoped session from it; in-memory ones ignore it.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::AgentRuntime;
use crate::domain::context::CallContext;
use crate::domain::error::ContextError;
use crate::domain::thread::{
    Message, MessageContent, MessageId, MessageOrder, NewThread, Thread, ThreadId,
};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    /// Tenant namespace selected once per session
    pub schema: String,
    pub max_connections: u32,
}

/// Agent directory, keyed by agent name.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert or replace the entry for `runtime.info.name`
    async fn save(&self, ctx: &CallContext, runtime: &AgentRuntime) -> Result<(), RepositoryError>;

    async fn find_by_name(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Option<AgentRuntime>, RepositoryError>;

    /// Entries for the known names among `names`, in no particular order
    async fn find_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<Vec<AgentRuntime>, RepositoryError>;

    async fn list_all(&self, ctx: &CallContext) -> Result<Vec<AgentRuntime>, RepositoryError>;

    /// Remove the named entries; unknown names are ignored. Returns how many were removed.
    async fn delete_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<u64, RepositoryError>;

    /// Stamp `last_live_at` with the current time
    async fn touch_live(&self, ctx: &CallContext, name: &str) -> Result<(), RepositoryError>;
}

/// Threads, their append-only message logs and pending mention records.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Persist a new thread with the next id from the thread sequence
    async fn create(&self, ctx: &CallContext, thread: NewThread) -> Result<Thread, RepositoryError>;

    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: ThreadId,
    ) -> Result<Option<Thread>, RepositoryError>;

    /// Threads with id greater than `cursor`, ascending, at most `limit`
    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: ThreadId,
        limit: usize,
    ) -> Result<Vec<Thread>, RepositoryError>;

    /// Add `agent` to the participant set. NotFound if the thread does not exist.
    async fn add_participant(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        agent: &str,
    ) -> Result<(), RepositoryError>;

    /// Append a message and record a pending mention for each of `mentions`,
    /// as one atomic step. NotFound if the thread does not exist.
    async fn append_message(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
        sender: &str,
        content: &MessageContent,
        mentions: &[String],
    ) -> Result<Message, RepositoryError>;

    /// One page of messages strictly beyond `cursor` in `order`.
    /// A zero cursor means "from the start" for either order.
    async fn list_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
        order: MessageOrder,
        cursor: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn count_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
    ) -> Result<u64, RepositoryError>;

    /// Remove and return the threads holding a pending mention of `agent`, ascending
    async fn take_mentions(
        &self,
        ctx: &CallContext,
        agent: &str,
    ) -> Result<Vec<ThreadId>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
