// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent registry behaviour: registration upserts, deregistration, the
//! unknown-name policy and liveness probing (scripted and over HTTP).

use agentnet_core::application::{
    AgentRegistry, LivenessProbe, PassthroughSessionScope, ProbeError, StandardAgentRegistry,
};
use agentnet_core::domain::agent::{AgentInfo, UnknownAgentPolicy};
use agentnet_core::domain::context::CallContext;
use agentnet_core::domain::error::ErrorKind;
use agentnet_core::infrastructure::{HttpLivenessProbe, InMemoryAgentRepository};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Probe that answers from a fixed set of healthy addresses and records calls.
#[derive(Default)]
struct ScriptedProbe {
    healthy: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    fn healthy(addrs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            healthy: addrs.iter().map(|a| a.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, addr: &str) -> Result<(), ProbeError> {
        self.calls.lock().push(addr.to_string());
        if self.healthy.contains(addr) {
            Ok(())
        } else {
            Err(ProbeError::Unreachable {
                addr: addr.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}

fn registry_with(
    probe: Arc<dyn LivenessProbe>,
    policy: UnknownAgentPolicy,
) -> StandardAgentRegistry {
    StandardAgentRegistry::new(
        Arc::new(InMemoryAgentRepository::new()),
        probe,
        Arc::new(PassthroughSessionScope),
        policy,
    )
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_register_then_lookup() {
    let registry = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry
        .register_agent(&ctx, "10.0.0.5:9000", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();

    let info = registry.get_agent_runtime_info(&ctx, &names(&["alice"])).await.unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].addr, "10.0.0.5:9000");
    assert_eq!(info[0].info.role, "planner");
}

#[tokio::test]
async fn test_reregistration_overwrites_entry() {
    let registry = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry
        .register_agent(&ctx, "10.0.0.5:9000", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry
        .register_agent(
            &ctx,
            "10.0.0.9:9000",
            vec![AgentInfo::new("alice", "critic").with_metadata("model", "small")],
        )
        .await
        .unwrap();

    let all = registry.get_all_agent_runtime_info(&ctx).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].addr, "10.0.0.9:9000");
    assert_eq!(all[0].info.role, "critic");
    assert_eq!(all[0].info.metadata.get("model").map(String::as_str), Some("small"));
}

#[tokio::test]
async fn test_register_rejects_empty_name() {
    let registry = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    let err = registry
        .register_agent(
            &ctx,
            "10.0.0.5:9000",
            vec![AgentInfo::new("alice", "planner"), AgentInfo::new("", "ghost")],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParams);

    // Nothing was written
    assert!(registry.get_all_agent_runtime_info(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deregister_unknown_name_succeeds() {
    let registry = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry.deregister_agent(&ctx, &names(&["nobody"])).await.unwrap();

    registry
        .register_agent(&ctx, "10.0.0.5:9000", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry.deregister_agent(&ctx, &names(&["alice", "nobody"])).await.unwrap();
    assert!(registry.get_all_agent_runtime_info(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_names_follow_policy() {
    let ctx = CallContext::background();

    let omit = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    omit.register_agent(&ctx, "a:1", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    let info = omit
        .get_agent_runtime_info(&ctx, &names(&["ghost", "alice", "alice"]))
        .await
        .unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].info.name, "alice");

    let fail = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Fail);
    fail.register_agent(&ctx, "a:1", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    let err = fail
        .get_agent_runtime_info(&ctx, &names(&["alice", "ghost"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_check_live_probes_all_and_stamps_liveness() {
    let probe = ScriptedProbe::healthy(&["a:1", "b:1"]);
    let registry = registry_with(probe.clone(), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry
        .register_agent(&ctx, "a:1", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry
        .register_agent(&ctx, "b:1", vec![AgentInfo::new("bob", "critic")])
        .await
        .unwrap();

    registry.check_live(&ctx, &names(&["alice", "bob"])).await.unwrap();

    let mut calls = probe.calls.lock().clone();
    calls.sort();
    assert_eq!(calls, vec!["a:1".to_string(), "b:1".to_string()]);

    let all = registry.get_all_agent_runtime_info(&ctx).await.unwrap();
    assert!(all.iter().all(|r| r.last_live_at.is_some()));
}

#[tokio::test]
async fn test_check_live_unknown_name_is_not_found() {
    let registry = registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit);
    let err = registry
        .check_live(&CallContext::background(), &names(&["ghost"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_check_live_probe_failure_is_internal() {
    let registry = registry_with(ScriptedProbe::healthy(&["a:1"]), UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry
        .register_agent(&ctx, "a:1", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry
        .register_agent(&ctx, "dead:1", vec![AgentInfo::new("zombie", "none")])
        .await
        .unwrap();

    let err = registry
        .check_live(&ctx, &names(&["alice", "zombie"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.detail().contains("connection refused"));

    let info = registry
        .get_agent_runtime_info(&ctx, &names(&["alice", "zombie"]))
        .await
        .unwrap();
    assert!(info[0].last_live_at.is_some());
    assert!(info[1].last_live_at.is_none());
}

#[tokio::test]
async fn test_http_probe_against_live_agent() {
    let mut server = mockito::Server::new_async().await;
    let health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .create_async()
        .await;

    let probe = Arc::new(HttpLivenessProbe::new(Duration::from_secs(2)).unwrap());
    let registry = registry_with(probe, UnknownAgentPolicy::Omit);
    let ctx = CallContext::background();

    registry
        .register_agent(&ctx, &server.host_with_port(), vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry.check_live(&ctx, &names(&["alice"])).await.unwrap();

    health.assert_async().await;
}

#[tokio::test]
async fn test_http_probe_non_success_status_fails() {
    let mut server = mockito::Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(503)
        .create_async()
        .await;

    let probe = HttpLivenessProbe::new(Duration::from_secs(2)).unwrap();
    let err = probe.probe(&server.host_with_port()).await.unwrap_err();
    assert!(matches!(err, ProbeError::Unhealthy { status: 503, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_and_deregister_leave_one_consistent_entry() {
    let registry = Arc::new(registry_with(ScriptedProbe::healthy(&[]), UnknownAgentPolicy::Omit));

    let mut writers = Vec::new();
    for n in 0..8 {
        let registry = registry.clone();
        writers.push(tokio::spawn(async move {
            let ctx = CallContext::background();
            for _ in 0..25 {
                if n % 4 == 3 {
                    registry.deregister_agent(&ctx, &names(&["alice"])).await.unwrap();
                } else {
                    let info = AgentInfo::new("alice", format!("role-{}", n))
                        .with_metadata("writer", n.to_string());
                    registry
                        .register_agent(&ctx, &format!("w{}:9000", n), vec![info])
                        .await
                        .unwrap();
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let all = registry
        .get_all_agent_runtime_info(&CallContext::background())
        .await
        .unwrap();
    assert!(all.len() <= 1, "name has {} entries", all.len());
    if let Some(entry) = all.first() {
        let writer = entry.info.metadata.get("writer").cloned().unwrap();
        assert_eq!(entry.info.name, "alice");
        assert_eq!(entry.info.role, format!("role-{}", writer));
        assert_eq!(entry.addr, format!("w{}:9000", writer));
    }
}

/// Liveness check that never answers.
struct NeverAnswers;

#[async_trait]
impl LivenessProbe for NeverAnswers {
    async fn probe(&self, _addr: &str) -> Result<(), ProbeError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

async fn registry_with_hanging_agent() -> StandardAgentRegistry {
    let registry = registry_with(Arc::new(NeverAnswers), UnknownAgentPolicy::Omit);
    registry
        .register_agent(&CallContext::background(), "a:1", vec![AgentInfo::new("alice", "planner")])
        .await
        .unwrap();
    registry
}

#[tokio::test]
async fn test_check_live_deadline_aborts_hanging_check() {
    let registry = registry_with_hanging_agent().await;
    let ctx = CallContext::background().with_timeout(Duration::from_millis(20));

    let alice = names(&["alice"]);
    let check = registry.check_live(&ctx, &alice);
    let err = tokio::time::timeout(Duration::from_secs(2), check)
        .await
        .expect("check_live did not honour the deadline")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.message(), "context deadline exceeded");

    let info = registry
        .get_agent_runtime_info(&CallContext::background(), &names(&["alice"]))
        .await
        .unwrap();
    assert!(info[0].last_live_at.is_none());
}

#[tokio::test]
async fn test_check_live_cancellation_aborts_hanging_check() {
    let registry = registry_with_hanging_agent().await;
    let ctx = CallContext::background();

    let cancel = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let alice = names(&["alice"]);
    let check = registry.check_live(&ctx, &alice);
    let err = tokio::time::timeout(Duration::from_secs(2), check)
        .await
        .expect("check_live did not honour cancellation")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.message(), "context canceled");
}
