//! Shared fakes for offline-sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use offline_sync::error::{ApiError, ApiResult, StoreError, StoreResult};
use offline_sync::models::{NewOutboxEntry, OutboxEntry, SendRequest};
use offline_sync::{
    Connectivity, MessageApi, Notice, OutboxStore, ResilientOutbox, ServerMessage,
    SqliteOutboxStore, SyncEngine, SyncObserver,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SendAttempt {
    pub chat_id: i64,
    pub text: Option<String>,
    pub client_message_id: String,
}

/// In-process stand-in for the messenger API. Dedupes on
/// `(chat_id, client_message_id)` the way the server does.
pub struct ScriptedApi {
    authenticated: AtomicBool,
    verify_ok: AtomicBool,
    fetch_ok: AtomicBool,
    next_id: AtomicI64,
    failing: Mutex<HashMap<String, u16>>,
    lose_response: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<SendAttempt>>,
    stored: Mutex<Vec<ServerMessage>>,
    hold: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            authenticated: AtomicBool::new(true),
            verify_ok: AtomicBool::new(true),
            fetch_ok: AtomicBool::new(true),
            next_id: AtomicI64::new(100),
            failing: Mutex::new(HashMap::new()),
            lose_response: Mutex::new(HashSet::new()),
            attempts: Mutex::new(Vec::new()),
            stored: Mutex::new(Vec::new()),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::SeqCst);
    }

    pub fn set_verify_ok(&self, value: bool) {
        self.verify_ok.store(value, Ordering::SeqCst);
    }

    pub fn set_fetch_ok(&self, value: bool) {
        self.fetch_ok.store(value, Ordering::SeqCst);
    }

    /// Reject sends whose text equals `text` with `status`.
    pub fn fail_text(&self, text: &str, status: u16) {
        self.failing.lock().insert(text.to_string(), status);
    }

    /// Store the message but report a network error, as after a timeout.
    pub fn lose_response_for(&self, text: &str) {
        self.lose_response.lock().insert(text.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
        self.lose_response.lock().clear();
    }

    /// Park every send until [`Self::release_sends`].
    pub fn hold_sends(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_send(&self) {
        self.entered.notified().await;
    }

    pub fn release_sends(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.attempts.lock().clone()
    }

    pub fn attempted_texts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .iter()
            .filter_map(|a| a.text.clone())
            .collect()
    }

    pub fn stored(&self) -> Vec<ServerMessage> {
        self.stored.lock().clone()
    }

    pub fn stored_texts(&self) -> Vec<String> {
        self.stored
            .lock()
            .iter()
            .filter_map(|m| m.text.clone())
            .collect()
    }

    pub fn seed(&self, chat_id: i64, text: &str) -> ServerMessage {
        let message = server_message(self.next_id.fetch_add(1, Ordering::SeqCst), chat_id, text);
        self.stored.lock().push(message.clone());
        message
    }

    fn store(&self, chat_id: i64, request: &SendRequest<'_>) -> ServerMessage {
        let mut stored = self.stored.lock();
        if let Some(existing) = stored.iter().find(|m| {
            m.chat_id == Some(chat_id)
                && m.client_message_id.as_deref() == Some(request.client_message_id.as_str())
        }) {
            return existing.clone();
        }

        let mut message = server_message(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            chat_id,
            request.payload.text.as_deref().unwrap_or_default(),
        );
        message.text = request.payload.text.clone();
        message.message_type = request.payload.message_type.clone();
        message.file_url = request.payload.file_url.clone();
        message.client_message_id = Some(request.client_message_id.clone());
        stored.push(message.clone());
        message
    }
}

#[async_trait]
impl MessageApi for ScriptedApi {
    async fn send_message(&self, chat_id: i64, request: &SendRequest<'_>) -> ApiResult<ServerMessage> {
        self.attempts.lock().push(SendAttempt {
            chat_id,
            text: request.payload.text.clone(),
            client_message_id: request.client_message_id.clone(),
        });

        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let text = request.payload.text.clone().unwrap_or_default();
        if let Some(status) = self.failing.lock().get(&text).copied() {
            return Err(ApiError::Status {
                status,
                message: "scripted failure".into(),
            });
        }

        let message = self.store(chat_id, request);
        if self.lose_response.lock().contains(&text) {
            return Err(ApiError::Network("operation timed out".into()));
        }
        Ok(message)
    }

    async fn fetch_messages(&self, chat_id: i64) -> ApiResult<Vec<ServerMessage>> {
        if !self.fetch_ok.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(self
            .stored
            .lock()
            .iter()
            .filter(|m| m.chat_id == Some(chat_id))
            .cloned()
            .collect())
    }

    async fn verify_session(&self) -> ApiResult<()> {
        if self.verify_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::Network("connection refused".into()))
        }
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

pub fn server_message(id: i64, chat_id: i64, text: &str) -> ServerMessage {
    ServerMessage {
        id,
        chat_id: Some(chat_id),
        sender_id: Some(1),
        text: Some(text.to_string()),
        message_type: "text".into(),
        file_url: None,
        file_name: None,
        file_size: None,
        file_type: None,
        voice_url: None,
        voice_duration: None,
        status: Some("sent".into()),
        created_at: None,
        client_message_id: None,
        sender_name: Some("Alice".into()),
        sender_avatar: None,
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    notices: Mutex<Vec<Notice>>,
    refreshes: AtomicUsize,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Notice) -> bool) -> usize {
        self.notices.lock().iter().filter(|n| pred(n)).count()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncObserver for RecordingObserver {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }

    async fn refresh_chats(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Durable store whose disk is always full.
pub struct FailingStore;

#[async_trait]
impl OutboxStore for FailingStore {
    async fn enqueue(&self, _entry: NewOutboxEntry) -> StoreResult<OutboxEntry> {
        Err(StoreError::Corrupt("database or disk is full".into()))
    }

    async fn pending(&self) -> StoreResult<Vec<OutboxEntry>> {
        Err(StoreError::Corrupt("database or disk is full".into()))
    }

    async fn remove(&self, _local_id: Uuid) -> StoreResult<bool> {
        Ok(false)
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(0)
    }
}

/// Durable store that accepts writes but can be made unreadable.
#[derive(Default)]
pub struct UnreadableStore {
    inner: offline_sync::MemoryOutboxStore,
    fail_reads: AtomicBool,
}

impl UnreadableStore {
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OutboxStore for UnreadableStore {
    async fn enqueue(&self, entry: NewOutboxEntry) -> StoreResult<OutboxEntry> {
        self.inner.enqueue(entry).await
    }

    async fn pending(&self) -> StoreResult<Vec<OutboxEntry>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("database disk image is malformed".into()));
        }
        self.inner.pending().await
    }

    async fn remove(&self, local_id: Uuid) -> StoreResult<bool> {
        self.inner.remove(local_id).await
    }

    async fn len(&self) -> StoreResult<usize> {
        self.inner.len().await
    }
}

pub struct Harness {
    pub api: Arc<ScriptedApi>,
    pub observer: Arc<RecordingObserver>,
    pub engine: Arc<SyncEngine>,
}

impl Harness {
    pub async fn new(online: bool) -> Self {
        let store = SqliteOutboxStore::in_memory()
            .await
            .expect("in-memory outbox");
        Self::with_outbox(online, ResilientOutbox::new(Arc::new(store)))
    }

    pub fn with_outbox(online: bool, outbox: ResilientOutbox) -> Self {
        let api = ScriptedApi::new();
        let observer = RecordingObserver::new();
        let engine = SyncEngine::new(api.clone(), outbox)
            .with_observer(observer.clone())
            .with_connectivity(Connectivity::new(online))
            .with_intervals(Duration::from_secs(3600), Duration::from_secs(3600));
        Self {
            api,
            observer,
            engine: Arc::new(engine),
        }
    }

    pub async fn pending_texts(&self) -> Vec<String> {
        self.engine
            .outbox_snapshot()
            .await
            .expect("outbox snapshot")
            .into_iter()
            .filter_map(|item| item.entry.payload.text)
            .collect()
    }
}
