//! Persistence seam for messages, participants and reactions.
//!
//! The repository stores and returns message text exactly as given; encryption
//! and decryption happen in `MessageService`.

pub mod postgres;

pub use postgres::PgMessageRepository;

use crate::error::AppResult;
use crate::models::{Account, InsertOutcome, Message, NewMessage};
use async_trait::async_trait;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_account(&self, user_id: i64) -> AppResult<Option<Account>>;

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> AppResult<bool>;

    /// Insert a message and bump other participants' unread counters.
    ///
    /// When `client_message_id` matches a row already stored for the same chat and
    /// sender, nothing is written and the existing row comes back with
    /// `created = false`.
    async fn insert_message(&self, message: NewMessage) -> AppResult<InsertOutcome>;

    /// Page of a chat's history, oldest first.
    async fn list_messages(&self, chat_id: i64, limit: i64, offset: i64)
        -> AppResult<Vec<Message>>;

    /// The `window` newest messages of a chat, newest first.
    async fn recent_messages(&self, chat_id: i64, window: i64) -> AppResult<Vec<Message>>;

    async fn find_message(&self, message_id: i64) -> AppResult<Option<Message>>;

    async fn delete_message(&self, message_id: i64) -> AppResult<bool>;

    /// Replace the user's reaction on a message.
    async fn set_reaction(&self, message_id: i64, user_id: i64, reaction: &str) -> AppResult<()>;

    async fn remove_reaction(&self, message_id: i64, user_id: i64) -> AppResult<bool>;

    async fn reset_unread(&self, chat_id: i64, user_id: i64) -> AppResult<()>;
}
