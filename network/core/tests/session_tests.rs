// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session binding rules, exercised against a recording backend.
//!
//! Each handle records the statements issued on it, so the tests can check
//! that schema selection happens exactly once per handle, before anything
//! else, and never again for an inherited session.

use agentnet_core::application::SessionScope;
use agentnet_core::domain::context::CallContext;
use agentnet_core::domain::repository::RepositoryError;
use agentnet_core::infrastructure::{SessionBackend, SessionFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct RecordingHandle {
    id: usize,
    statements: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandle {
    fn exec(&mut self, statement: &str) {
        self.statements.lock().push(statement.to_string());
    }
}

#[derive(Default)]
struct RecordingBackend {
    acquired: AtomicUsize,
    logs: Mutex<Vec<Arc<Mutex<Vec<String>>>>>,
}

#[async_trait]
impl SessionBackend for RecordingBackend {
    type Handle = RecordingHandle;

    async fn acquire(&self) -> Result<Self::Handle, RepositoryError> {
        let id = self.acquired.fetch_add(1, Ordering::SeqCst);
        let statements = Arc::new(Mutex::new(Vec::new()));
        self.logs.lock().push(statements.clone());
        Ok(RecordingHandle { id, statements })
    }

    async fn select_schema(
        &self,
        handle: &mut Self::Handle,
        schema: &str,
    ) -> Result<(), RepositoryError> {
        handle.exec(&format!("SET search_path TO \"{}\"", schema));
        Ok(())
    }
}

fn factory() -> Arc<SessionFactory<RecordingBackend>> {
    Arc::new(SessionFactory::new(RecordingBackend::default(), "tenant_a"))
}

#[tokio::test]
async fn test_schema_selected_once_before_other_statements() {
    let sessions = factory();
    let ctx = sessions.open_session(&CallContext::background()).await.unwrap();

    let session = sessions.current(&ctx).expect("session bound");
    {
        let mut handle = session.lock().await;
        handle.exec("SELECT 1");
        handle.exec("SELECT 2");
    }

    let statements = session.lock().await.statements.lock().clone();
    assert_eq!(
        statements,
        vec![
            "SET search_path TO \"tenant_a\"".to_string(),
            "SELECT 1".to_string(),
            "SELECT 2".to_string(),
        ]
    );
    assert_eq!(session.schema(), "tenant_a");
}

#[tokio::test]
async fn test_open_session_is_reentrant() {
    let sessions = factory();
    let outer = sessions.open_session(&CallContext::background()).await.unwrap();
    let inner = sessions.open_session(&outer).await.unwrap();
    let via_scope = sessions.open(&inner).await.unwrap();

    let a = sessions.current(&outer).unwrap();
    let b = sessions.current(&inner).unwrap();
    let c = sessions.current(&via_scope).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));

    let backend_logs = a.lock().await.statements.lock().clone();
    assert_eq!(backend_logs.len(), 1, "inherited session must not be re-selected");
}

#[tokio::test]
async fn test_separate_calls_get_separate_handles() {
    let sessions = factory();
    let first = sessions.open_session(&CallContext::background()).await.unwrap();
    let second = sessions.open_session(&CallContext::background()).await.unwrap();

    let a = sessions.current(&first).unwrap();
    let b = sessions.current(&second).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.lock().await.id, b.lock().await.id);

    for session in [a, b] {
        let statements = session.lock().await.statements.lock().clone();
        assert_eq!(statements, vec!["SET search_path TO \"tenant_a\"".to_string()]);
    }
}

#[tokio::test]
async fn test_with_session_binds_supplied_handle() {
    let sessions = factory();
    let log = Arc::new(Mutex::new(vec!["BEGIN".to_string()]));
    let handle = RecordingHandle {
        id: 99,
        statements: log.clone(),
    };

    let ctx = sessions.with_session(&CallContext::background(), handle).await.unwrap();
    assert_eq!(sessions.current(&ctx).unwrap().lock().await.id, 99);
    assert_eq!(
        log.lock().clone(),
        vec!["BEGIN".to_string(), "SET search_path TO \"tenant_a\"".to_string()]
    );
}

#[tokio::test]
async fn test_parent_context_stays_unbound() {
    let sessions = factory();
    let parent = CallContext::background();
    let child = sessions.open_session(&parent).await.unwrap();

    assert!(sessions.current(&parent).is_none());
    assert!(sessions.current(&child).is_some());
}

#[tokio::test]
async fn test_cancelled_context_does_not_acquire() {
    let sessions = factory();
    let ctx = CallContext::background();
    ctx.cancellation_token().cancel();

    let err = sessions.open_session(&ctx).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Context(_)));
}
