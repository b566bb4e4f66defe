// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Thread Repository
//!
//! Threads, the append-only `messages` log and the `mentions` ledger.
//!
//! Appending locks the owning thread row (the `updated_at` bump) before the
//! message id is drawn from the sequence, so per-thread commit order matches
//! id order and a page read never observes a gap that fills in later.
//! Mention delivery is a single `DELETE ... RETURNING`, so a mention is either
//! returned to exactly one caller or still pending.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Connection, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::context::CallContext;
use crate::domain::repository::{RepositoryError, ThreadRepository};
use crate::domain::thread::{
    Message, MessageContent, MessageId, MessageOrder, NewThread, Thread, ThreadId,
};
use crate::infrastructure::session::{PgSessionBackend, SessionFactory};

const THREAD_COLUMNS: &str = "id, instruction, participants, metadata, created_at, updated_at";

pub struct PostgresThreadRepository {
    sessions: Arc<SessionFactory<PgSessionBackend>>,
}

impl PostgresThreadRepository {
    pub fn new(sessions: Arc<SessionFactory<PgSessionBackend>>) -> Self {
        Self { sessions }
    }
}

fn to_u32(value: i64, what: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Database(format!("{} {} out of range", what, value)))
}

fn thread_from_row(row: &PgRow) -> Result<Thread, RepositoryError> {
    let metadata: serde_json::Value = row.try_get("metadata")?;
    let metadata: HashMap<String, String> = serde_json::from_value(metadata)?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Thread {
        id: ThreadId(to_u32(row.try_get("id")?, "thread id")?),
        instruction: row.try_get("instruction")?,
        participants: row.try_get("participants")?,
        metadata,
        created_at,
        updated_at,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, RepositoryError> {
    let content: serde_json::Value = row.try_get("content")?;
    Ok(Message {
        id: MessageId(to_u32(row.try_get("id")?, "message id")?),
        thread_id: ThreadId(to_u32(row.try_get("thread_id")?, "thread id")?),
        sender: row.try_get("sender")?,
        content: serde_json::from_value(content)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ThreadRepository for PostgresThreadRepository {
    async fn create(
        &self,
        ctx: &CallContext,
        thread: NewThread,
    ) -> Result<Thread, RepositoryError> {
        let metadata = serde_json::to_value(&thread.metadata)?;
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!(
            "INSERT INTO threads (instruction, participants, metadata) \
             VALUES ($1, $2, $3) RETURNING {}",
            THREAD_COLUMNS
        );
        let row = ctx
            .run(
                sqlx::query(&query)
                    .bind(&thread.instruction)
                    .bind(&thread.participants)
                    .bind(metadata)
                    .fetch_one(&mut **conn),
            )
            .await?
            .map_err(|e| RepositoryError::Database(format!("Failed to create thread: {}", e)))?;

        thread_from_row(&row)
    }

    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: ThreadId,
    ) -> Result<Option<Thread>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!("SELECT {} FROM threads WHERE id = $1", THREAD_COLUMNS);
        let row = ctx
            .run(sqlx::query(&query).bind(i64::from(id.0)).fetch_optional(&mut **conn))
            .await??;

        row.as_ref().map(thread_from_row).transpose()
    }

    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: ThreadId,
        limit: usize,
    ) -> Result<Vec<Thread>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = format!(
            "SELECT {} FROM threads WHERE id > $1 ORDER BY id ASC LIMIT $2",
            THREAD_COLUMNS
        );
        let rows = ctx
            .run(
                sqlx::query(&query)
                    .bind(i64::from(cursor.0))
                    .bind(limit as i64)
                    .fetch_all(&mut **conn),
            )
            .await??;

        rows.iter().map(thread_from_row).collect()
    }

    async fn add_participant(
        &self,
        ctx: &CallContext,
        id: ThreadId,
        agent: &str,
    ) -> Result<(), RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let result = ctx
            .run(
                sqlx::query(
                    r#"
                    UPDATE threads
                    SET participants = CASE
                        WHEN $2 = ANY(participants) THEN participants
                        ELSE array_append(participants, $2)
                    END
                    WHERE id = $1
                    "#,
                )
                .bind(i64::from(id.0))
                .bind(agent)
                .execute(&mut **conn),
            )
            .await??;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("thread {}", id)));
        }
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
        let document = serde_json::to_value(content)?;
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        ctx.run(async {
            let mut tx = Connection::begin(&mut **conn).await?;

            let locked =
                sqlx::query("UPDATE threads SET updated_at = now() WHERE id = $1 RETURNING id")
                    .bind(i64::from(thread_id.0))
                    .fetch_optional(&mut *tx)
                    .await?;
            if locked.is_none() {
                return Err(RepositoryError::NotFound(format!("thread {}", thread_id)));
            }

            let row = sqlx::query(
                r#"
                INSERT INTO messages (thread_id, sender, content, created_at, updated_at)
                VALUES ($1, $2, $3, now(), now())
                RETURNING id, thread_id, sender, content, created_at, updated_at
                "#,
            )
            .bind(i64::from(thread_id.0))
            .bind(sender)
            .bind(document)
            .fetch_one(&mut *tx)
            .await?;

            if !mentions.is_empty() {
                sqlx::query(
                    "INSERT INTO mentions (agent_name, thread_id) \
                     SELECT unnest($1::text[]), $2::BIGINT ON CONFLICT DO NOTHING",
                )
                .bind(mentions)
                .bind(i64::from(thread_id.0))
                .execute(&mut *tx)
                .await?;
            }

            let message = message_from_row(&row)?;
            tx.commit().await?;
            Ok::<_, RepositoryError>(message)
        })
        .await?
    }

    async fn list_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
        order: MessageOrder,
        cursor: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let query = match order {
            MessageOrder::Oldest => {
                r#"
                SELECT id, thread_id, sender, content, created_at, updated_at FROM messages
                WHERE thread_id = $1 AND ($2::BIGINT = 0 OR id > $2)
                ORDER BY id ASC LIMIT $3
                "#
            }
            MessageOrder::Latest => {
                r#"
                SELECT id, thread_id, sender, content, created_at, updated_at FROM messages
                WHERE thread_id = $1 AND ($2::BIGINT = 0 OR id < $2)
                ORDER BY id DESC LIMIT $3
                "#
            }
        };

        let rows = ctx
            .run(
                sqlx::query(query)
                    .bind(i64::from(thread_id.0))
                    .bind(i64::from(cursor.0))
                    .bind(limit as i64)
                    .fetch_all(&mut **conn),
            )
            .await??;

        rows.iter().map(message_from_row).collect()
    }

    async fn count_messages(
        &self,
        ctx: &CallContext,
        thread_id: ThreadId,
    ) -> Result<u64, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let count: i64 = ctx
            .run(
                sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE thread_id = $1")
                    .bind(i64::from(thread_id.0))
                    .fetch_one(&mut **conn),
            )
            .await??;

        Ok(count.max(0) as u64)
    }

    async fn take_mentions(
        &self,
        ctx: &CallContext,
        agent: &str,
    ) -> Result<Vec<ThreadId>, RepositoryError> {
        let session = self.sessions.session(ctx).await?;
        let mut conn = session.lock().await;

        let ids: Vec<i64> = ctx
            .run(
                sqlx::query_scalar("DELETE FROM mentions WHERE agent_name = $1 RETURNING thread_id")
                    .bind(agent)
                    .fetch_all(&mut **conn),
            )
            .await??;

        let mut threads = ids
            .into_iter()
            .map(|id| to_u32(id, "thread id").map(ThreadId))
            .collect::<Result<Vec<_>, _>>()?;
        threads.sort();
        Ok(threads)
    }
}
