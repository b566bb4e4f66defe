// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Call Context
//!
//! Request-scoped state threaded through every operation: a start instant for
//! latency accounting, an optional deadline, a cancellation token and a small
//! typed value bag. The database session bound to a request travels in the
//! value bag, so nested calls within one request share it.
//!
//! Contexts are cheap to clone. Values are stored behind `Arc`, and a child
//! produced by [`CallContext::with_value`] never affects its parent.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::domain::error::ContextError;

#[derive(Clone)]
pub struct CallContext {
    started_at: Instant,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("values", &self.values.len())
            .finish()
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// A context with no deadline and a fresh cancellation token.
    pub fn background() -> Self {
        Self {
            started_at: Instant::now(),
            deadline: None,
            cancel: CancellationToken::new(),
            values: HashMap::new(),
        }
    }

    /// Bound the call by `timeout` from now. An existing earlier deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Derive a child context carrying `value`, replacing any value of the same type.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: Arc<T>) -> Self {
        let mut child = self.clone();
        child.values.insert(TypeId::of::<T>(), value);
        child
    }

    pub fn value<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ContextError::Canceled),
            _ = deadline => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    #[test]
    fn test_values_are_scoped_to_child() {
        let parent = CallContext::background();
        let child = parent.with_value(Arc::new(Tenant("acme")));
        assert!(parent.value::<Tenant>().is_none());
        assert_eq!(child.value::<Tenant>().as_deref(), Some(&Tenant("acme")));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        let first = ctx.deadline();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), first);
    }

    #[tokio::test]
    async fn test_run_respects_cancellation() {
        let ctx = CallContext::background();
        ctx.cancellation_token().cancel();
        let res = ctx.run(async { 1 }).await;
        assert_eq!(res, Err(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_run_respects_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(10));
        let res = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(res, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_completes_within_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }
}
