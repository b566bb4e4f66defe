// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Registry
//!
//! Application service owning the agent directory: registration, removal,
//! liveness probing and runtime snapshots.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Maintain the name → endpoint directory
//! - **Collaborators:**
//!   - Domain: `AgentRuntime`, `AgentRepository`
//!   - Infrastructure: `LivenessProbe` (HTTP health check), `SessionScope`
//!
//! # Error Handling
//!
//! Returns [`NetworkError`]:
//! - InvalidParams: empty agent name on registration
//! - NotFound: `check_live` on an unregistered name, or an unknown name under
//!   the `fail` policy
//! - Internal: probe failure, storage failure

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::session::SessionScope;
use crate::domain::agent::{AgentInfo, AgentRuntime, UnknownAgentPolicy};
use crate::domain::context::CallContext;
use crate::domain::error::{NetworkError, NetworkResult};
use crate::domain::repository::AgentRepository;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("agent at {addr} is unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("agent at {addr} answered health check with status {status}")]
    Unhealthy { addr: String, status: u16 },
}

/// Reachability check against a registered address.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, addr: &str) -> Result<(), ProbeError>;
}

#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Upsert one directory entry per `info` at `addr`
    async fn register_agent(
        &self,
        ctx: &CallContext,
        addr: &str,
        agents: Vec<AgentInfo>,
    ) -> NetworkResult<()>;

    /// Remove the named entries; absent names are ignored
    async fn deregister_agent(&self, ctx: &CallContext, names: &[String]) -> NetworkResult<()>;

    /// Probe every named agent; succeeds only if all probes succeed
    async fn check_live(&self, ctx: &CallContext, names: &[String]) -> NetworkResult<()>;

    /// Snapshot of the named entries, in request order
    async fn get_agent_runtime_info(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> NetworkResult<Vec<AgentRuntime>>;

    /// Snapshot of the whole directory, sorted by name
    async fn get_all_agent_runtime_info(
        &self,
        ctx: &CallContext,
    ) -> NetworkResult<Vec<AgentRuntime>>;
}

pub struct StandardAgentRegistry {
    repository: Arc<dyn AgentRepository>,
    probe: Arc<dyn LivenessProbe>,
    sessions: Arc<dyn SessionScope>,
    unknown_agents: UnknownAgentPolicy,
}

impl StandardAgentRegistry {
    pub fn new(
        repository: Arc<dyn AgentRepository>,
        probe: Arc<dyn LivenessProbe>,
        sessions: Arc<dyn SessionScope>,
        unknown_agents: UnknownAgentPolicy,
    ) -> Self {
        Self {
            repository,
            probe,
            sessions,
            unknown_agents,
        }
    }
}

#[async_trait]
impl AgentRegistry for StandardAgentRegistry {
    async fn register_agent(
        &self,
        ctx: &CallContext,
        addr: &str,
        agents: Vec<AgentInfo>,
    ) -> NetworkResult<()> {
        if let Some(pos) = agents.iter().position(|a| a.name.is_empty()) {
            return Err(NetworkError::invalid_params(format!("info[{}].name is required", pos)));
        }

        let ctx = self.sessions.open(ctx).await?;
        for info in agents {
            debug!(agent = %info.name, role = %info.role, addr = %addr, "Registering agent");
            let runtime = AgentRuntime::new(addr, info);
            self.repository
                .save(&ctx, &runtime)
                .await
                .map_err(|e| {
                    NetworkError::from(e)
                        .with_context(format!("failed to register agent {}", runtime.name()))
                })?;
        }

        Ok(())
    }

    async fn deregister_agent(&self, ctx: &CallContext, names: &[String]) -> NetworkResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        let ctx = self.sessions.open(ctx).await?;
        let removed = self
            .repository
            .delete_by_names(&ctx, names)
            .await
            .map_err(|e| NetworkError::from(e).with_context("failed to deregister agents"))?;

        info!(requested = names.len(), removed, "Deregistered agents");
        Ok(())
    }

    async fn check_live(&self, ctx: &CallContext, names: &[String]) -> NetworkResult<()> {
        let ctx = self.sessions.open(ctx).await?;

        let mut targets: Vec<AgentRuntime> = Vec::with_capacity(names.len());
        for name in names {
            if targets.iter().any(|t| t.name() == name) {
                continue;
            }
            match self.repository.find_by_name(&ctx, name).await? {
                Some(runtime) => targets.push(runtime),
                None => return Err(NetworkError::not_found(format!("agent {} not found", name))),
            }
        }

        let probes = targets.iter().map(|runtime| {
            let ctx = &ctx;
            async move { (runtime.name(), ctx.run(self.probe.probe(&runtime.addr)).await) }
        });
        let outcomes = futures::future::join_all(probes).await;

        let mut first_failure: Option<NetworkError> = None;
        for (name, outcome) in outcomes {
            match outcome {
                Ok(Ok(())) => self.repository.touch_live(&ctx, name).await?,
                Ok(Err(probe_err)) => {
                    first_failure.get_or_insert_with(|| {
                        NetworkError::internal(format!("agent {} is not live", name))
                            .with_source(probe_err)
                    });
                }
                Err(ctx_err) => {
                    first_failure.get_or_insert_with(|| NetworkError::from(ctx_err));
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn get_agent_runtime_info(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> NetworkResult<Vec<AgentRuntime>> {
        let ctx = self.sessions.open(ctx).await?;
        let mut found: HashMap<String, AgentRuntime> = self
            .repository
            .find_by_names(&ctx, names)
            .await?
            .into_iter()
            .map(|r| (r.info.name.clone(), r))
            .collect();

        let mut snapshot = Vec::with_capacity(found.len());
        for name in names {
            match found.remove(name) {
                Some(runtime) => snapshot.push(runtime),
                // Already emitted for an earlier duplicate of this name
                None if snapshot.iter().any(|r: &AgentRuntime| r.name() == name) => {}
                None => {
                    if self.unknown_agents == UnknownAgentPolicy::Fail {
                        return Err(NetworkError::not_found(format!("agent {} not found", name)));
                    }
                }
            }
        }

        Ok(snapshot)
    }

    async fn get_all_agent_runtime_info(
        &self,
        ctx: &CallContext,
    ) -> NetworkResult<Vec<AgentRuntime>> {
        let ctx = self.sessions.open(ctx).await?;
        let mut all = self.repository.list_all(&ctx).await?;
        all.sort_by(|a, b| a.info.name.cmp(&b.info.name));
        Ok(all)
    }
}
