// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Thread Manager
//!
//! Application service for threads, their message logs and the per-agent
//! mention ledger.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Thread lifecycle, message append, paging and
//!   mention delivery
//! - **Collaborators:**
//!   - Domain: `Thread`, `Message`, mention detection, `ThreadRepository`
//!   - Infrastructure: `SessionScope`
//!
//! # Flow (AddMessage)
//!
//! 1. Open (or inherit) the request session
//! 2. Load the thread; NotFound if absent
//! 3. Detect which other participants the text addresses
//! 4. Append the message and the mention records in one atomic step
//!
//! The manager returns one page per call; callers own the cursor.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::application::session::SessionScope;
use crate::domain::context::CallContext;
use crate::domain::error::{NetworkError, NetworkResult};
use crate::domain::mention::addressed_participants;
use crate::domain::network_config::PaginationConfig;
use crate::domain::repository::ThreadRepository;
use crate::domain::thread::{
    next_thread_cursor, Message, MessageContent, MessageId, MessageOrder, NewThread, Thread,
    ThreadId,
};

/// One page of threads plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadPage {
    pub threads: Vec<Thread>,
    pub next_cursor: ThreadId,
}

#[async_trait]
pub trait ThreadManager: Send + Sync {
    async fn create_thread(
        &self,
        ctx: &CallContext,
        instruction: &str,
        participants: Vec<String>,
        metadata: HashMap<String, String>,
    ) -> NetworkResult<Thread>;

    async fn get_thread_by_id(&self, ctx: &CallContext, id: ThreadId) -> NetworkResult<Thread>;

    /// Threads with id greater than `cursor`, ascending
    async fn get_threads(
        &self,
        ctx: &CallContext,
        cursor: ThreadId,
        limit: u32,
    ) -> NetworkResult<ThreadPage>;

    /// Add `agent_name` to the participants; a no-op if already present
    async fn invite(&self, ctx: &CallContext, id: ThreadId, agent_name: &str) -> NetworkResult<()>;

    async fn add_message(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        sender: &str,
        content: MessageContent,
    ) -> NetworkResult<Message>;

    /// One page strictly beyond `cursor` in `order`; a zero cursor is unbounded
    async fn get_messages(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        order: MessageOrder,
        cursor: MessageId,
        limit: u32,
    ) -> NetworkResult<Vec<Message>>;

    async fn get_num_messages(&self, ctx: &CallContext, id: ThreadId) -> NetworkResult<u64>;

    /// Drain the agent's pending mentions; each mention is delivered once
    async fn is_mentioned_once(
        &self,
        ctx: &CallContext,
        agent_name: &str,
    ) -> NetworkResult<Vec<ThreadId>>;
}

pub struct StandardThreadManager {
    repository: Arc<dyn ThreadRepository>,
    sessions: Arc<dyn SessionScope>,
    pagination: PaginationConfig,
}

impl StandardThreadManager {
    pub fn new(
        repository: Arc<dyn ThreadRepository>,
        sessions: Arc<dyn SessionScope>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            repository,
            sessions,
            pagination,
        }
    }

    async fn require_thread(&self, ctx: &CallContext, id: ThreadId) -> NetworkResult<Thread> {
        self.repository
            .find_by_id(ctx, id)
            .await?
            .ok_or_else(|| NetworkError::not_found(format!("thread {} not found", id)))
    }
}

#[async_trait]
impl ThreadManager for StandardThreadManager {
    async fn create_thread(
        &self,
        ctx: &CallContext,
        instruction: &str,
        participants: Vec<String>,
        metadata: HashMap<String, String>,
    ) -> NetworkResult<Thread> {
        if participants.is_empty() {
            return Err(NetworkError::invalid_params("participants must not be empty"));
        }
        if participants.iter().any(String::is_empty) {
            return Err(NetworkError::invalid_params("participant names must not be empty"));
        }

        let ctx = self.sessions.open(ctx).await?;
        let thread = self
            .repository
            .create(&ctx, NewThread::new(instruction, participants).with_metadata(metadata))
            .await
            .map_err(|e| NetworkError::from(e).with_context("failed to create thread"))?;

        debug!(thread_id = %thread.id, participants = thread.participants.len(), "Created thread");
        Ok(thread)
    }

    async fn get_thread_by_id(&self, ctx: &CallContext, id: ThreadId) -> NetworkResult<Thread> {
        let ctx = self.sessions.open(ctx).await?;
        self.require_thread(&ctx, id).await
    }

    async fn get_threads(
        &self,
        ctx: &CallContext,
        cursor: ThreadId,
        limit: u32,
    ) -> NetworkResult<ThreadPage> {
        let ctx = self.sessions.open(ctx).await?;
        let threads = self
            .repository
            .list_after(&ctx, cursor, self.pagination.effective_limit(limit))
            .await?;
        let next_cursor = next_thread_cursor(&threads);
        Ok(ThreadPage { threads, next_cursor })
    }

    async fn invite(&self, ctx: &CallContext, id: ThreadId, agent_name: &str) -> NetworkResult<()> {
        if agent_name.is_empty() {
            return Err(NetworkError::invalid_params("agent_name is required"));
        }

        let ctx = self.sessions.open(ctx).await?;
        self.repository.add_participant(&ctx, id, agent_name).await?;
        debug!(thread_id = %id, agent = %agent_name, "Invited agent");
        Ok(())
    }

    async fn add_message(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        sender: &str,
        content: MessageContent,
    ) -> NetworkResult<Message> {
        if sender.is_empty() {
            return Err(NetworkError::invalid_params("sender is required"));
        }

        let ctx = self.sessions.open(ctx).await?;
        let thread = self.require_thread(&ctx, id).await?;
        let mentions = addressed_participants(&thread, sender, &content);

        let message = self
            .repository
            .append_message(&ctx, id, sender, &content, &mentions)
            .await
            .map_err(|e| NetworkError::from(e).with_context("failed to add message"))?;

        debug!(
            thread_id = %id,
            message_id = %message.id,
            sender = %sender,
            mentions = ?mentions,
            "Appended message"
        );
        Ok(message)
    }

    async fn get_messages(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        order: MessageOrder,
        cursor: MessageId,
        limit: u32,
    ) -> NetworkResult<Vec<Message>> {
        let ctx = self.sessions.open(ctx).await?;
        self.require_thread(&ctx, id).await?;
        let page = self
            .repository
            .list_messages(&ctx, id, order, cursor, self.pagination.effective_limit(limit))
            .await?;
        Ok(page)
    }

    async fn get_num_messages(&self, ctx: &CallContext, id: ThreadId) -> NetworkResult<u64> {
        let ctx = self.sessions.open(ctx).await?;
        self.require_thread(&ctx, id).await?;
        Ok(self.repository.count_messages(&ctx, id).await?)
    }

    async fn is_mentioned_once(
        &self,
        ctx: &CallContext,
        agent_name: &str,
    ) -> NetworkResult<Vec<ThreadId>> {
        if agent_name.is_empty() {
            return Err(NetworkError::invalid_params("agent_name is required"));
        }

        let ctx = self.sessions.open(ctx).await?;
        Ok(self.repository.take_mentions(&ctx, agent_name).await?)
    }
}
