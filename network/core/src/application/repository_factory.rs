// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations, plus the matching session
//! scope, based on storage backend configuration.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Select persistence adapters at startup

use std::sync::Arc;

use crate::application::session::{PassthroughSessionScope, SessionScope};
use crate::domain::repository::{AgentRepository, RepositoryError, StorageBackend, ThreadRepository};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_agent::PostgresAgentRepository;
use crate::infrastructure::repositories::postgres_thread::PostgresThreadRepository;
use crate::infrastructure::repositories::{InMemoryAgentRepository, InMemoryThreadRepository};
use crate::infrastructure::session::{PgSessionBackend, SessionFactory};

/// Repositories for one storage backend, sharing one session scope.
#[derive(Clone)]
pub struct Repositories {
    pub agents: Arc<dyn AgentRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub sessions: Arc<dyn SessionScope>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            agents: Arc::new(InMemoryAgentRepository::new()),
            threads: Arc::new(InMemoryThreadRepository::new()),
            sessions: Arc::new(PassthroughSessionScope),
        }
    }
}

/// Creates the repositories for the configured backend. For PostgreSQL this
/// connects the pool and bootstraps the tenant schema.
pub async fn create_repositories(
    backend: &StorageBackend,
) -> Result<Repositories, RepositoryError> {
    match backend {
        StorageBackend::InMemory => Ok(Repositories::in_memory()),
        StorageBackend::PostgreSQL(config) => {
            let db = Database::connect(config).await?;
            db.bootstrap(&config.schema).await?;

            let sessions = Arc::new(SessionFactory::new(
                PgSessionBackend::new(db.get_pool().clone()),
                config.schema.clone(),
            ));

            Ok(Repositories {
                agents: Arc::new(PostgresAgentRepository::new(sessions.clone())),
                threads: Arc::new(PostgresThreadRepository::new(sessions.clone())),
                sessions,
            })
        }
    }
}
