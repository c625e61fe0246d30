use super::MessageRepository;
use crate::error::AppResult;
use crate::models::{Account, InsertOutcome, Message, NewMessage};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

const MESSAGE_COLUMNS: &str = r#"
    m.id, m.chat_id, m.sender_id, m.text, m.message_type,
    m.file_url, m.file_name, m.file_size, m.file_type,
    m.voice_url, m.voice_duration, m.status, m.created_at,
    m.client_message_id,
    u.name AS sender_name,
    u.avatar AS sender_avatar
"#;

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn message_by_id<'e, E>(executor: E, message_id: i64) -> AppResult<Option<Message>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m LEFT JOIN users u ON m.sender_id = u.id WHERE m.id = $1"
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(message_id)
            .fetch_optional(executor)
            .await?;
        Ok(message)
    }

    async fn message_by_client_id(
        tx: &mut Transaction<'_, Postgres>,
        chat_id: i64,
        sender_id: i64,
        client_message_id: &str,
    ) -> AppResult<Option<Message>> {
        let sql = format!(
            r#"SELECT {MESSAGE_COLUMNS}
               FROM messages m LEFT JOIN users u ON m.sender_id = u.id
               WHERE m.chat_id = $1 AND m.sender_id = $2 AND m.client_message_id = $3"#
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(chat_id)
            .bind(sender_id)
            .bind(client_message_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(message)
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_account(&self, user_id: i64) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, avatar, bio, birthdate, online, is_admin, banned, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = $1 AND user_id = $2)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_message(&self, message: NewMessage) -> AppResult<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        if let Some(client_id) = message.client_message_id.as_deref() {
            if let Some(existing) =
                Self::message_by_client_id(&mut tx, message.chat_id, message.sender_id, client_id)
                    .await?
            {
                tx.commit().await?;
                debug!(
                    chat_id = message.chat_id,
                    message_id = existing.id,
                    "duplicate client_message_id, returning stored message"
                );
                return Ok(InsertOutcome {
                    message: existing,
                    created: false,
                });
            }
        }

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO messages (
                chat_id, sender_id, text, message_type,
                file_url, file_name, file_size, file_type,
                voice_url, voice_duration, status, client_message_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'sent', $11)
            ON CONFLICT (chat_id, sender_id, client_message_id)
                WHERE client_message_id IS NOT NULL
                DO NOTHING
            RETURNING id
            "#,
        )
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.text)
        .bind(&message.message_type)
        .bind(&message.file_url)
        .bind(&message.file_name)
        .bind(message.file_size)
        .bind(&message.file_type)
        .bind(&message.voice_url)
        .bind(message.voice_duration)
        .bind(&message.client_message_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = inserted else {
            // Lost a race with a concurrent replay of the same client id
            let client_id = message.client_message_id.as_deref().unwrap_or_default();
            let existing =
                Self::message_by_client_id(&mut tx, message.chat_id, message.sender_id, client_id)
                    .await?
                    .ok_or(crate::error::AppError::Internal)?;
            tx.commit().await?;
            return Ok(InsertOutcome {
                message: existing,
                created: false,
            });
        };

        sqlx::query(
            r#"
            UPDATE chat_participants
            SET unread_count = unread_count + 1
            WHERE chat_id = $1 AND user_id <> $2
            "#,
        )
        .bind(message.chat_id)
        .bind(message.sender_id)
        .execute(&mut *tx)
        .await?;

        let stored = Self::message_by_id(&mut *tx, id)
            .await?
            .ok_or(crate::error::AppError::Internal)?;
        tx.commit().await?;

        Ok(InsertOutcome {
            message: stored,
            created: true,
        })
    }

    async fn list_messages(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let sql = format!(
            r#"SELECT {MESSAGE_COLUMNS}
               FROM messages m LEFT JOIN users u ON m.sender_id = u.id
               WHERE m.chat_id = $1
               ORDER BY m.created_at ASC, m.id ASC
               LIMIT $2 OFFSET $3"#
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(chat_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    async fn recent_messages(&self, chat_id: i64, window: i64) -> AppResult<Vec<Message>> {
        let sql = format!(
            r#"SELECT {MESSAGE_COLUMNS}
               FROM messages m LEFT JOIN users u ON m.sender_id = u.id
               WHERE m.chat_id = $1
               ORDER BY m.created_at DESC, m.id DESC
               LIMIT $2"#
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(chat_id)
            .bind(window)
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    async fn find_message(&self, message_id: i64) -> AppResult<Option<Message>> {
        Self::message_by_id(&self.pool, message_id).await
    }

    async fn delete_message(&self, message_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_reaction(&self, message_id: i64, user_id: i64, reaction: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, user_id, reaction)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, user_id)
            DO UPDATE SET reaction = EXCLUDED.reaction, created_at = NOW()
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(reaction)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_reaction(&self, message_id: i64, user_id: i64) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2")
                .bind(message_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_unread(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET unread_count = 0 WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
