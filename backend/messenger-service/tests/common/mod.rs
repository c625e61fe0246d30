#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use crypto_core::{jwt::JwtValidator, MessageCipher};
use messenger_service::{
    config::MessageLimits,
    error::AppResult,
    models::{Account, InsertOutcome, Message, NewMessage},
    repository::MessageRepository,
    services::MessageService,
    state::AppState,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "messenger-test-secret";
pub const TEST_MESSAGE_KEY: [u8; 32] = [42u8; 32];

#[derive(Default)]
struct Tables {
    users: HashMap<i64, Account>,
    /// (chat_id, user_id) -> unread_count
    participants: HashMap<(i64, i64), i32>,
    messages: Vec<Message>,
    /// (message_id, user_id) -> reaction
    reactions: HashMap<(i64, i64), String>,
    next_id: i64,
}

/// Repository double backed by plain maps.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: i64, name: &str) {
        self.insert_account(id, name, false, false);
    }

    pub fn add_admin(&self, id: i64, name: &str) {
        self.insert_account(id, name, true, false);
    }

    pub fn add_banned_user(&self, id: i64, name: &str) {
        self.insert_account(id, name, false, true);
    }

    fn insert_account(&self, id: i64, name: &str, is_admin: bool, banned: bool) {
        self.tables.lock().users.insert(
            id,
            Account {
                id,
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                avatar: None,
                bio: None,
                birthdate: None,
                online: false,
                is_admin,
                banned,
                created_at: Utc::now(),
            },
        );
    }

    pub fn add_participant(&self, chat_id: i64, user_id: i64) {
        self.tables.lock().participants.insert((chat_id, user_id), 0);
    }

    pub fn unread(&self, chat_id: i64, user_id: i64) -> Option<i32> {
        self.tables.lock().participants.get(&(chat_id, user_id)).copied()
    }

    /// Text exactly as stored, envelope or legacy plaintext.
    pub fn stored_text(&self, message_id: i64) -> Option<String> {
        self.tables
            .lock()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .and_then(|m| m.text.clone())
    }

    pub fn set_stored_text(&self, message_id: i64, text: &str) {
        let mut tables = self.tables.lock();
        if let Some(m) = tables.messages.iter_mut().find(|m| m.id == message_id) {
            m.text = Some(text.to_string());
        }
    }

    pub fn message_count(&self) -> usize {
        self.tables.lock().messages.len()
    }

    pub fn reaction(&self, message_id: i64, user_id: i64) -> Option<String> {
        self.tables.lock().reactions.get(&(message_id, user_id)).cloned()
    }

    /// Insert a row bypassing the service, e.g. a legacy plaintext message.
    pub fn insert_raw(&self, chat_id: i64, sender_id: i64, text: &str) -> i64 {
        let mut tables = self.tables.lock();
        let message = Self::build(
            &mut tables,
            NewMessage {
                chat_id,
                sender_id,
                text: Some(text.to_string()),
                message_type: "text".into(),
                file_url: None,
                file_name: None,
                file_size: None,
                file_type: None,
                voice_url: None,
                voice_duration: None,
                client_message_id: None,
            },
        );
        let id = message.id;
        tables.messages.push(message);
        id
    }

    fn build(tables: &mut Tables, new: NewMessage) -> Message {
        tables.next_id += 1;
        let id = tables.next_id;
        let sender = tables.users.get(&new.sender_id).cloned();
        Message {
            id,
            chat_id: new.chat_id,
            sender_id: Some(new.sender_id),
            text: new.text,
            message_type: new.message_type,
            file_url: new.file_url,
            file_name: new.file_name,
            file_size: new.file_size,
            file_type: new.file_type,
            voice_url: new.voice_url,
            voice_duration: new.voice_duration,
            status: "sent".into(),
            // Strictly increasing so ordering never ties
            created_at: Utc::now() + Duration::milliseconds(id),
            client_message_id: new.client_message_id,
            sender_name: sender.as_ref().map(|u| u.name.clone()),
            sender_avatar: sender.and_then(|u| u.avatar),
        }
    }

    fn chat_messages(tables: &Tables, chat_id: i64) -> Vec<Message> {
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        messages
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository {
    async fn find_account(&self, user_id: i64) -> AppResult<Option<Account>> {
        Ok(self.tables.lock().users.get(&user_id).cloned())
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .participants
            .contains_key(&(chat_id, user_id)))
    }

    async fn insert_message(&self, new: NewMessage) -> AppResult<InsertOutcome> {
        let mut tables = self.tables.lock();
        if let Some(client_id) = new.client_message_id.as_deref() {
            if let Some(existing) = tables.messages.iter().find(|m| {
                m.chat_id == new.chat_id
                    && m.sender_id == Some(new.sender_id)
                    && m.client_message_id.as_deref() == Some(client_id)
            }) {
                return Ok(InsertOutcome {
                    message: existing.clone(),
                    created: false,
                });
            }
        }

        let (chat_id, sender_id) = (new.chat_id, new.sender_id);
        let message = Self::build(&mut tables, new);
        tables.messages.push(message.clone());
        for ((chat, user), unread) in tables.participants.iter_mut() {
            if *chat == chat_id && *user != sender_id {
                *unread += 1;
            }
        }
        Ok(InsertOutcome {
            message,
            created: true,
        })
    }

    async fn list_messages(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let tables = self.tables.lock();
        Ok(Self::chat_messages(&tables, chat_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn recent_messages(&self, chat_id: i64, window: i64) -> AppResult<Vec<Message>> {
        let tables = self.tables.lock();
        Ok(Self::chat_messages(&tables, chat_id)
            .into_iter()
            .rev()
            .take(window as usize)
            .collect())
    }

    async fn find_message(&self, message_id: i64) -> AppResult<Option<Message>> {
        Ok(self
            .tables
            .lock()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn delete_message(&self, message_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.lock();
        let before = tables.messages.len();
        tables.messages.retain(|m| m.id != message_id);
        tables.reactions.retain(|(m, _), _| *m != message_id);
        Ok(tables.messages.len() < before)
    }

    async fn set_reaction(&self, message_id: i64, user_id: i64, reaction: &str) -> AppResult<()> {
        self.tables
            .lock()
            .reactions
            .insert((message_id, user_id), reaction.to_string());
        Ok(())
    }

    async fn remove_reaction(&self, message_id: i64, user_id: i64) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .reactions
            .remove(&(message_id, user_id))
            .is_some())
    }

    async fn reset_unread(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        if let Some(unread) = self.tables.lock().participants.get_mut(&(chat_id, user_id)) {
            *unread = 0;
        }
        Ok(())
    }
}

pub struct Fixture {
    pub repo: Arc<InMemoryRepository>,
    pub cipher: Arc<MessageCipher>,
    pub jwt: Arc<JwtValidator>,
    pub service: MessageService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_limits(MessageLimits::default())
    }

    pub fn with_limits(limits: MessageLimits) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let cipher = Arc::new(MessageCipher::from_bytes(&TEST_MESSAGE_KEY).unwrap());
        let jwt = Arc::new(JwtValidator::new(TEST_JWT_SECRET));
        let dyn_repo: Arc<dyn MessageRepository> = repo.clone();
        let service = MessageService::new(dyn_repo, cipher.clone(), limits);
        Self {
            repo,
            cipher,
            jwt,
            service,
        }
    }

    /// Chat 1 with Alice (1) and Bob (2); Carol (3) exists but is not a member.
    pub fn with_chat() -> Self {
        let fixture = Self::new();
        fixture.repo.add_user(1, "Alice");
        fixture.repo.add_user(2, "Bob");
        fixture.repo.add_user(3, "Carol");
        fixture.repo.add_participant(1, 1);
        fixture.repo.add_participant(1, 2);
        fixture
    }

    pub fn token(&self, user_id: i64) -> String {
        self.jwt.issue_token(user_id).unwrap()
    }

    pub fn state(&self) -> AppState {
        AppState {
            messages: self.service.clone(),
        }
    }

    pub fn dyn_repo(&self) -> Arc<dyn MessageRepository> {
        self.repo.clone()
    }
}
