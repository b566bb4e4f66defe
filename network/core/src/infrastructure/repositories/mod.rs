// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository contracts defined in the
//! domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve agents, threads, messages and mentions
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresAgentRepository** - Agent directory (`agent_runtimes`)
//! - **PostgresThreadRepository** - Threads, messages and the mention ledger
//!
//! Both resolve their connection through the request's bound session, so
//! every statement runs inside the tenant schema.
//!
//! ## In-Memory Repositories
//!
//! - **InMemoryAgentRepository** - `DashMap` keyed by agent name
//! - **InMemoryThreadRepository** - one `parking_lot::Mutex` over the whole
//!   thread store, so id assignment, appends and mention records are atomic

pub mod postgres_agent;
pub mod postgres_thread;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use crate::domain::agent::AgentRuntime;
use crate::domain::context::CallContext;
use crate::domain::repository::{AgentRepository, RepositoryError, ThreadRepository};
use crate::domain::thread::{
    Message, MessageContent, MessageId, MessageOrder, NewThread, Thread, ThreadId,
};

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<DashMap<String, AgentRuntime>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn save(&self, ctx: &CallContext, runtime: &AgentRuntime) -> Result<(), RepositoryError> {
        ctx.check()?;
        self.agents.insert(runtime.info.name.clone(), runtime.clone());
        Ok(())
    }

    async fn find_by_name(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Option<AgentRuntime>, RepositoryError> {
        ctx.check()?;
        Ok(self.agents.get(name).map(|entry| entry.value().clone()))
    }

    async fn find_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<Vec<AgentRuntime>, RepositoryError> {
        ctx.check()?;
        let mut seen = BTreeSet::new();
        Ok(names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .filter_map(|name| self.agents.get(name).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn list_all(&self, ctx: &CallContext) -> Result<Vec<AgentRuntime>, RepositoryError> {
        ctx.check()?;
        Ok(self.agents.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn delete_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<u64, RepositoryError> {
        ctx.check()?;
        Ok(names.iter().filter(|name| self.agents.remove(name.as_str()).is_some()).count() as u64)
    }

    async fn touch_live(&self, ctx: &CallContext, name: &str) -> Result<(), RepositoryError> {
        ctx.check()?;
        match self.agents.get_mut(name) {
            Some(mut entry) => {
                entry.mark_live(Utc::now());
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("agent {}", name))),
        }
    }
}

#[derive(Default)]
struct ThreadStore {
    threads: BTreeMap<ThreadId, Thread>,
    /// Per-thread logs, ascending by id
    messages: HashMap<ThreadId, Vec<Message>>,
    last_thread_id: u32,
    last_message_id: u32,
    /// Pending mentions per agent name
    mentions: HashMap<String, BTreeSet<ThreadId>>,
}

#[derive(Clone, Default)]
pub struct InMemoryThreadRepository {
    store: Arc<Mutex<ThreadStore>>,
}

impl InMemoryThreadRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn thread_not_found(id: ThreadId) -> RepositoryError {
    RepositoryError::NotFound(format!("thread {}", id))
}

#[async_trait]
impl ThreadRepository for InMemoryThreadRepository {
    async fn create(
        &self,
        ctx: &CallContext,
        thread: NewThread,
    ) -> Result<Thread, RepositoryError> {
        ctx.check()?;
        let mut store = self.store.lock();
        let id = store
            .last_thread_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Database("thread id sequence exhausted".to_string()))?;
        store.last_thread_id = id;

        let now = Utc::now();
        let thread = Thread {
            id: ThreadId(id),
            instruction: thread.instruction,
            participants: thread.participants,
            metadata: thread.metadata,
            created_at: now,
            updated_at: now,
        };
        store.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: ThreadId,
    ) -> Result<Option<Thread>, RepositoryError> {
        ctx.check()?;
        Ok(self.store.lock().threads.get(&id).cloned())
    }

    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: ThreadId,
        limit: usize,
    ) -> Result<Vec<Thread>, RepositoryError> {
        ctx.check()?;
        let store = self.store.lock();
        Ok(store
            .threads
            .range((Bound::Excluded(cursor), Bound::Unbounded))
            .take(limit)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn add_participant(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        agent: &str,
    ) -> Result<(), RepositoryError> {
        ctx.check()?;
        let mut store = self.store.lock();
        let thread = store.threads.get_mut(&id).ok_or_else(|| thread_not_found(id))?;
        thread.add_participant(agent);
        Ok(())
    }

    async fn append_message(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
        sender: &str,
        content: &MessageContent,
        mentions: &[String],
    ) -> Result<Message, RepositoryError> {
        ctx.check()?;
        let mut store = self.store.lock();
        if !store.threads.contains_key(&thread_id) {
            return Err(thread_not_found(thread_id));
        }

        let id = store
            .last_message_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Database("message id sequence exhausted".to_string()))?;
        store.last_message_id = id;

        let now = Utc::now();
        let message = Message {
            id: MessageId(id),
            thread_id,
            sender: sender.to_string(),
            content: content.clone(),
            created_at: now,
            updated_at: now,
        };

        store.messages.entry(thread_id).or_default().push(message.clone());
        if let Some(thread) = store.threads.get_mut(&thread_id) {
            thread.updated_at = now;
        }
        for agent in mentions {
            store.mentions.entry(agent.clone()).or_default().insert(thread_id);
        }

        Ok(message)
    }

    async fn list_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
        order: MessageOrder,
        cursor: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        ctx.check()?;
        let store = self.store.lock();
        let Some(log) = store.messages.get(&thread_id) else {
            return Ok(Vec::new());
        };

        let page = match order {
            MessageOrder::Oldest => {
                let start = if cursor.0 == 0 {
                    0
                } else {
                    log.partition_point(|m| m.id <= cursor)
                };
                log[start..].iter().take(limit).cloned().collect()
            }
            MessageOrder::Latest => {
                let end = if cursor.0 == 0 {
                    log.len()
                } else {
                    log.partition_point(|m| m.id < cursor)
                };
                log[..end].iter().rev().take(limit).cloned().collect()
            }
        };
        Ok(page)
    }

    async fn count_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
    ) -> Result<u64, RepositoryError> {
        ctx.check()?;
        Ok(self.store.lock().messages.get(&thread_id).map_or(0, |log| log.len() as u64))
    }

    async fn take_mentions(
        &self,
        ctx: &CallContext,
        agent: &str,
    ) -> Result<Vec<ThreadId>, RepositoryError> {
        ctx.check()?;
        let pending = self.store.lock().mentions.remove(agent);
        Ok(pending.map(|set| set.into_iter().collect()).unwrap_or_default())
    }
}
