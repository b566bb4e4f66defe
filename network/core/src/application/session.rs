// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session scope port
//!
//! Application services open a session at the top of every operation so that
//! all repository calls made while serving one request share a single
//! tenant-scoped database handle. Opening is reentrant: a context that
//! already carries a session is returned unchanged.

use async_trait::async_trait;

use crate::domain::context::CallContext;
use crate::domain::repository::RepositoryError;

#[async_trait]
pub trait SessionScope: Send + Sync {
    /// Return `ctx` bound to a session, binding a fresh one if it has none.
    async fn open(&self, ctx: &CallContext) -> Result<CallContext, RepositoryError>;
}

/// Session scope for backends without per-call handles (in-memory storage).
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSessionScope;

#[async_trait]
impl SessionScope for PassthroughSessionScope {
    async fn open(&self, ctx: &CallContext) -> Result<CallContext, RepositoryError> {
        ctx.check()?;
        Ok(ctx.clone())
    }
}
