// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! Production `AgentRepository` implementation backed by the `agent_runtimes`
//! table. Registration is an upsert on the name key, so concurrent
//! registrations of one name always leave a single row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::agent::{AgentInfo, AgentRuntime};
use crate::domain::context::CallContext;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::infrastructure::session::{PgSessionBackend, SessionFactory};

const SELECT_COLUMNS: &str =
    "SELECT name, role, metadata, addr, registered_at, last_live_at FROM agent_runtimes";

pub struct PostgresAgentRepository {
    sessions: Arc<SessionFactory<PgSessionBackend>>,
}

impl PostgresAgentRepository {
    pub fn new(sessions: Arc<SessionFactory<PgSessionBackend>>) -> Self {
        Self { sessions }
    }
}

fn runtime_from_row(row: &PgRow) -> Result<AgentRuntime, RepositoryError> {
    let metadata: serde_json::Value = row.try_get("metadata")?;
    let metadata: HashMap<String, String> = serde_json::from_value(metadata)?;
    let registered_at: DateTime<Utc> = row.try_get("registered_at")?;
    let last_live_at: Option<DateTime<Utc>> = row.try_get("last_live_at")?;

    Ok(AgentRuntime {
        info: AgentInfo {
            name: row.try_get("name")?,
            role: row.try_get("role")?,
            metadata,
        },
        addr: row.try_get("addr")?,
        registered_at,
        last_live_at,
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn save(&self, ctx: &CallContext, runtime: &AgentRuntime) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_value(&runtime.info.metadata)?;
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        ctx.run(
            sqlx::query(
                r#"
                INSERT INTO agent_runtimes (name, role, metadata, addr, registered_at, last_live_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (name) DO UPDATE SET
                    role = EXCLUDED.role,
                    metadata = EXCLUDED.metadata,
                    addr = EXCLUDED.addr,
                    registered_at = EXCLUDED.registered_at,
                    last_live_at = EXCLUDED.last_live_at
                "#,
            )
            .bind(&runtime.info.name)
            .bind(&runtime.info.role)
            .bind(metadata)
            .bind(&runtime.addr)
            .bind(runtime.registered_at)
            .bind(runtime.last_live_at)
            .execute(&mut **conn),
        )
        .await?
        .map_err(|e| RepositoryError::Database(format!("Failed to save agent: {}", e)))?;

        Ok(())
    }

    async fn find_by_name(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Option<AgentRuntime>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!("{} WHERE name = $1", SELECT_COLUMNS);
        let row = ctx
            .run(sqlx::query(&query).bind(name).fetch_optional(&mut **conn))
            .await??;

        row.as_ref().map(runtime_from_row).transpose()
    }

    async fn find_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<Vec<AgentRuntime>, RepositoryError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!("{} WHERE name = ANY($1)", SELECT_COLUMNS);
        let rows = ctx
            .run(sqlx::query(&query).bind(names).fetch_all(&mut **conn))
            .await??;

        rows.iter().map(runtime_from_row).collect()
    }

    async fn list_all(&self, ctx: &CallContext) -> Result<Vec<AgentRuntime>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!("{} ORDER BY name", SELECT_COLUMNS);
        let rows = ctx.run(sqlx::query(&query).fetch_all(&mut **conn)).await??;

        rows.iter().map(runtime_from_row).collect()
    }

    async fn delete_by_names(
        &self,
        ctx: &CallContext,
        names: &[String],
    ) -> Result<u64, RepositoryError> {
        if names.is_empty() {
            return Ok(0);
        }
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let result = ctx
            .run(
                sqlx::query("DELETE FROM agent_runtimes WHERE name = ANY($1)")
                    .bind(names)
                    .execute(&mut **conn),
            )
            .await??;

        Ok(result.rows_affected())
    }

    async fn touch_live(&self, ctx: &CallContext, name: &str) -> Result<(), RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let result = ctx
            .run(
                sqlx::query("UPDATE agent_runtimes SET last_live_at = now() WHERE name = $1")
                    .bind(name)
                    .execute(&mut **conn),
            )
            .await??;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("agent {}", name)));
        }
        Ok(())
    }
}
