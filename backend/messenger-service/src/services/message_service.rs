use crate::config::MessageLimits;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    Account, HistoryQuery, Message, NewMessage, SendMessageRequest, DEFAULT_MESSAGE_TYPE,
};
use crate::repository::MessageRepository;
use crypto_core::{DecryptResult, MessageCipher};
use std::sync::Arc;
use tracing::{info, warn};

pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Message use cases. Text is encrypted on the way in and decrypted on every
/// way out; the repository only ever sees envelopes.
#[derive(Clone)]
pub struct MessageService {
    repo: Arc<dyn MessageRepository>,
    cipher: Arc<MessageCipher>,
    limits: MessageLimits,
}

/// Result of a send: the stored message and whether this call created it.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub created: bool,
}

impl MessageService {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        cipher: Arc<MessageCipher>,
        limits: MessageLimits,
    ) -> Self {
        Self {
            repo,
            cipher,
            limits,
        }
    }

    async fn ensure_participant(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        if self.repo.is_participant(chat_id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotParticipant)
        }
    }

    fn decrypt_in_place(&self, message: &mut Message) {
        let Some(stored) = message.text.take() else {
            return;
        };
        let result = self.cipher.decrypt(&stored);
        if let Some(reason) = result.fallback_reason() {
            metrics::record_decrypt_fallback(reason);
        }
        message.text = Some(result.into_text());
    }

    fn decrypt_all(&self, mut messages: Vec<Message>) -> Vec<Message> {
        for message in &mut messages {
            self.decrypt_in_place(message);
        }
        messages
    }

    pub async fn send_message(
        &self,
        user_id: i64,
        chat_id: i64,
        request: SendMessageRequest,
    ) -> AppResult<SentMessage> {
        if request.is_empty() {
            return Err(AppError::EmptyMessage);
        }
        self.ensure_participant(chat_id, user_id).await?;

        let text = self.cipher.encrypt(request.text.as_deref())?;
        let new_message = NewMessage {
            chat_id,
            sender_id: user_id,
            text,
            message_type: request
                .message_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string()),
            file_url: request.file_url,
            file_name: request.file_name,
            file_size: request.file_size,
            file_type: request.file_type,
            voice_url: request.voice_url,
            voice_duration: request.voice_duration,
            client_message_id: request.client_message_id.filter(|id| !id.is_empty()),
        };

        let outcome = self.repo.insert_message(new_message).await?;
        let mut message = outcome.message;
        self.decrypt_in_place(&mut message);

        if outcome.created {
            metrics::record_message_sent();
            info!(chat_id, message_id = message.id, sender_id = user_id, "message stored");
        }

        Ok(SentMessage {
            message,
            created: outcome.created,
        })
    }

    pub async fn get_messages(
        &self,
        user_id: i64,
        chat_id: i64,
        query: HistoryQuery,
    ) -> AppResult<Vec<Message>> {
        let limit = query
            .limit
            .unwrap_or(self.limits.history_page_limit)
            .clamp(1, self.limits.history_max_limit);
        let offset = query.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest("offset must not be negative".into()));
        }

        self.ensure_participant(chat_id, user_id).await?;
        let messages = self.repo.list_messages(chat_id, limit, offset).await?;
        Ok(self.decrypt_all(messages))
    }

    /// Case-insensitive substring search over decrypted text.
    ///
    /// Scans the newest `search_window` rows and stops at `search_result_limit`
    /// matches. Results are newest first.
    pub async fn search_messages(
        &self,
        user_id: i64,
        chat_id: i64,
        query: Option<&str>,
    ) -> AppResult<Vec<Message>> {
        let query = query.unwrap_or_default();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Err(AppError::SearchQueryTooShort {
                min_len: MIN_SEARCH_QUERY_LEN,
            });
        }
        self.ensure_participant(chat_id, user_id).await?;
        metrics::record_search();

        let needle = query.to_lowercase();
        let rows = self
            .repo
            .recent_messages(chat_id, self.limits.search_window)
            .await?;

        let mut matches = Vec::new();
        for mut message in rows {
            let Some(stored) = message.text.take() else {
                continue;
            };
            let result = self.cipher.decrypt(&stored);
            if let DecryptResult::Fallback { reason, .. } = &result {
                metrics::record_decrypt_fallback(*reason);
            }
            let plain = result.into_text();
            if !plain.is_empty() && plain.to_lowercase().contains(&needle) {
                message.text = Some(plain);
                matches.push(message);
                if matches.len() >= self.limits.search_result_limit {
                    break;
                }
            }
        }
        Ok(matches)
    }

    async fn require_message(&self, message_id: i64) -> AppResult<Message> {
        self.repo
            .find_message(message_id)
            .await?
            .ok_or(AppError::MessageNotFound)
    }

    pub async fn add_reaction(
        &self,
        user_id: i64,
        message_id: i64,
        reaction: Option<&str>,
    ) -> AppResult<()> {
        let reaction = reaction
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(AppError::ReactionMissing)?;
        let message = self.require_message(message_id).await?;
        self.ensure_participant(message.chat_id, user_id).await?;
        self.repo.set_reaction(message_id, user_id, reaction).await
    }

    pub async fn remove_reaction(&self, user_id: i64, message_id: i64) -> AppResult<()> {
        self.repo.remove_reaction(message_id, user_id).await?;
        Ok(())
    }

    pub async fn mark_read(&self, user_id: i64, chat_id: i64) -> AppResult<()> {
        self.repo.reset_unread(chat_id, user_id).await
    }

    /// Only the sender or an admin may delete.
    pub async fn delete_message(&self, user_id: i64, message_id: i64) -> AppResult<()> {
        let message = self.require_message(message_id).await?;
        if message.sender_id != Some(user_id) {
            let is_admin = self
                .repo
                .find_account(user_id)
                .await?
                .map_or(false, |a| a.is_admin);
            if !is_admin {
                warn!(message_id, user_id, "delete refused: not sender or admin");
                return Err(AppError::NotMessageOwner);
            }
        }
        self.repo.delete_message(message_id).await?;
        info!(message_id, user_id, "message deleted");
        Ok(())
    }

    pub async fn current_account(&self, user_id: i64) -> AppResult<Account> {
        self.repo
            .find_account(user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}
