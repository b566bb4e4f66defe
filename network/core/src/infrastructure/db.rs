// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that the
//! session factory draws connections from, and bootstraps the tenant schema.
//!
//! Tables live inside the tenant schema and are always addressed unqualified;
//! the session layer selects the schema on every connection it hands out.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::repository::{PostgresConfig, RepositoryError};
use crate::infrastructure::session::quote_ident;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS threads (
        id           BIGSERIAL PRIMARY KEY,
        instruction  TEXT        NOT NULL DEFAULT '',
        participants TEXT[]      NOT NULL DEFAULT '{}',
        metadata     JSONB       NOT NULL DEFAULT '{}'::jsonb,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id         BIGSERIAL PRIMARY KEY,
        thread_id  BIGINT      NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
        sender     TEXT        NOT NULL,
        content    JSONB       NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS messages_thread_id_idx ON messages (thread_id, id)",
    r#"
    CREATE TABLE IF NOT EXISTS mentions (
        agent_name TEXT   NOT NULL,
        thread_id  BIGINT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
        PRIMARY KEY (agent_name, thread_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_runtimes (
        name          TEXT PRIMARY KEY,
        role          TEXT        NOT NULL DEFAULT '',
        metadata      JSONB       NOT NULL DEFAULT '{}'::jsonb,
        addr          TEXT        NOT NULL,
        registered_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_live_at  TIMESTAMPTZ
    )
    "#,
];

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tenant schema and its tables if they do not exist.
    pub async fn bootstrap(&self, schema: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let schema = quote_ident(schema);

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL search_path TO {}", schema))
            .execute(&mut *tx)
            .await?;
        for ddl in TABLES {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(schema = %schema, "Database schema ready");
        Ok(())
    }
}
