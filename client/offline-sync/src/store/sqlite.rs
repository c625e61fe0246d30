//! SQLite-backed outbox via sqlx.

use super::{MessageCache, OutboxStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{MessagePayload, NewOutboxEntry, OutboxEntry, ServerMessage};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Durable outbox. Every write runs in its own transaction; an early return
/// drops the transaction and rolls it back.
#[derive(Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

impl SqliteOutboxStore {
    /// Open (or create) the database file and apply pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;
        MIGRATOR.run(&pool).await?;

        debug!(path = %path.as_ref().display(), "outbox database opened");
        Ok(Self { pool })
    }

    /// Private in-memory database. One pinned connection, since each SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> StoreResult<OutboxEntry> {
        let local_id: String = row.try_get("local_id")?;
        let payload: String = row.try_get("payload")?;
        Ok(OutboxEntry {
            seq: row.try_get("seq")?,
            local_id: Uuid::parse_str(&local_id)
                .map_err(|e| StoreError::Corrupt(format!("local_id {local_id}: {e}")))?,
            chat_id: row.try_get("chat_id")?,
            payload: serde_json::from_str::<MessagePayload>(&payload)?,
            enqueued_at: row.try_get("enqueued_at")?,
        })
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn enqueue(&self, entry: NewOutboxEntry) -> StoreResult<OutboxEntry> {
        let payload = serde_json::to_string(&entry.payload)?;

        let mut tx = self.pool.begin().await?;
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO pending_messages (local_id, chat_id, payload, enqueued_at)
            VALUES (?, ?, ?, ?)
            RETURNING seq
            "#,
        )
        .bind(entry.local_id.to_string())
        .bind(entry.chat_id)
        .bind(&payload)
        .bind(entry.enqueued_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(local_id = %entry.local_id, chat_id = entry.chat_id, seq, "outbox entry stored");
        Ok(OutboxEntry::from_new(seq, entry))
    }

    async fn pending(&self) -> StoreResult<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT seq, local_id, chat_id, payload, enqueued_at
            FROM pending_messages
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn remove(&self, local_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM pending_messages WHERE local_id = ?")
            .bind(local_id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn len(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl MessageCache for SqliteOutboxStore {
    async fn cache_messages(&self, chat_id: i64, messages: &[ServerMessage]) -> StoreResult<()> {
        let json = serde_json::to_string(messages)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO messages_cache (chat_id, messages, fetched_at)
            VALUES (?, ?, ?)
            ON CONFLICT (chat_id) DO UPDATE SET
                messages = excluded.messages,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(chat_id)
        .bind(&json)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn cached_messages(&self, chat_id: i64) -> StoreResult<Option<Vec<ServerMessage>>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT messages FROM messages_cache WHERE chat_id = ?")
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }
}
