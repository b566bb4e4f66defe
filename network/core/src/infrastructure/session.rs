// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tenant-Scoped Database Sessions
//!
//! A session is one database handle bound to a [`CallContext`]. Binding a
//! handle issues exactly one schema-selection statement on it before anything
//! else runs, so every statement issued during the request resolves table
//! names inside the configured tenant schema.
//!
//! The bound session travels in the context's value bag under
//! [`SessionSlot`], a key type private to this module. Nothing outside this
//! module can read, replace or forge it.
//!
//! [`SessionBackend`] abstracts handle acquisition so the binding rules can be
//! exercised without a live database.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, Postgres};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::application::session::SessionScope;
use crate::domain::context::CallContext;
use crate::domain::repository::RepositoryError;

#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    type Handle: Send + 'static;

    /// Obtain a handle from the underlying pool
    async fn acquire(&self) -> Result<Self::Handle, RepositoryError>;

    /// Issue the schema-selection statement on `handle`
    async fn select_schema(
        &self,
        handle: &mut Self::Handle,
        schema: &str,
    ) -> Result<(), RepositoryError>;
}

/// A database handle that has had its schema selected.
pub struct Session<H> {
    handle: Mutex<H>,
    schema: String,
}

impl<H> Session<H> {
    /// Exclusive access to the handle for the duration of one statement or transaction
    pub async fn lock(&self) -> MutexGuard<'_, H> {
        self.handle.lock().await
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

struct SessionSlot<H>(Arc<Session<H>>);

pub struct SessionFactory<B: SessionBackend> {
    backend: B,
    schema: String,
}

impl<B: SessionBackend> SessionFactory<B> {
    pub fn new(backend: B, schema: impl Into<String>) -> Self {
        Self {
            backend,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The session bound to `ctx`, if any.
    pub fn current(&self, ctx: &CallContext) -> Option<Arc<Session<B::Handle>>> {
        ctx.value::<SessionSlot<B::Handle>>().map(|slot| Arc::clone(&slot.0))
    }

    /// Return `ctx` unchanged if it already carries a session; otherwise
    /// acquire a handle and bind it.
    pub async fn open_session(&self, ctx: &CallContext) -> Result<CallContext, RepositoryError> {
        if self.current(ctx).is_some() {
            return Ok(ctx.clone());
        }

        let handle = ctx.run(self.backend.acquire()).await??;
        self.with_session(ctx, handle).await
    }

    /// Select the schema on `handle` and return a child of `ctx` carrying it.
    pub async fn with_session(
        &self,
        ctx: &CallContext,
        mut handle: B::Handle,
    ) -> Result<CallContext, RepositoryError> {
        ctx.run(self.backend.select_schema(&mut handle, &self.schema)).await??;
        debug!(schema = %self.schema, "Bound database session");

        let session = Arc::new(Session {
            handle: Mutex::new(handle),
            schema: self.schema.clone(),
        });
        Ok(ctx.with_value(Arc::new(SessionSlot(session))))
    }

    /// The session bound to `ctx`, binding a fresh one when there is none.
    /// A fresh session lives only as long as the returned `Arc`.
    pub async fn session(
        &self,
        ctx: &CallContext,
    ) -> Result<Arc<Session<B::Handle>>, RepositoryError> {
        if let Some(session) = self.current(ctx) {
            return Ok(session);
        }
        let bound = self.open_session(ctx).await?;
        self.current(&bound)
            .ok_or_else(|| {
                RepositoryError::Database("session was not bound to context".to_string())
            })
    }
}

#[async_trait]
impl<B: SessionBackend> SessionScope for SessionFactory<B> {
    async fn open(&self, ctx: &CallContext) -> Result<CallContext, RepositoryError> {
        self.open_session(ctx).await
    }
}

/// PostgreSQL pool connections, scoped with `SET search_path`.
pub struct PgSessionBackend {
    pool: PgPool,
}

impl PgSessionBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Double-quoted identifier, with embedded quotes doubled.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[async_trait]
impl SessionBackend for PgSessionBackend {
    type Handle = PoolConnection<Postgres>;

    async fn acquire(&self) -> Result<Self::Handle, RepositoryError> {
        Ok(self.pool.acquire().await?)
    }

    async fn select_schema(
        &self,
        handle: &mut Self::Handle,
        schema: &str,
    ) -> Result<(), RepositoryError> {
        let statement = format!("SET search_path TO {}", quote_ident(schema));
        sqlx::query(&statement).execute(&mut **handle).await?;
        Ok(())
    }
}
