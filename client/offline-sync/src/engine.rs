//! Offline-first send path and outbox drain.
//!
//! The engine owns the outbox, the API client and the connectivity view.
//! Sends go straight to the server when possible and land in the outbox
//! otherwise; [`SyncEngine::sync_pending_messages`] replays the outbox in
//! enqueue order, deleting each entry as soon as the server
//! confirms it. Each entry is replayed with its `local_id` as
//! `client_message_id` so the server drops duplicates from retried sends.

use crate::api::{HttpMessageApi, MessageApi};
use crate::background::{BackgroundSync, BACKGROUND_SYNC_TAG};
use crate::config::ClientConfig;
use crate::connectivity::Connectivity;
use crate::error::{SyncError, SyncResult};
use crate::models::{
    CurrentUser, DrainOutcome, LoadedMessages, LocalMessage, MessagePayload, NewOutboxEntry,
    OutboxEntry, OutboxItem, OutboxStatus, SendOutcome, SendRequest, SyncState, SyncStatus,
};
use crate::notify::{Notice, SyncObserver, TracingObserver};
use crate::store::{open_outbox, MessageCache, ResilientOutbox};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    BackgroundSync(String),
    ForceSync,
    Connectivity(bool),
}

/// Cloneable sender for platform events into a running [`SyncEngine::run`] loop.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl SyncHandle {
    /// Deliver a background-sync wake-up. Returns false if the engine stopped.
    pub fn background_sync(&self, tag: &str) -> bool {
        self.tx.send(Trigger::BackgroundSync(tag.to_string())).is_ok()
    }

    pub fn force_sync(&self) -> bool {
        self.tx.send(Trigger::ForceSync).is_ok()
    }

    /// Platform online/offline event.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send(Trigger::Connectivity(online)).is_ok()
    }
}

/// Resets the drain flag when the cycle ends, including on panic.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    api: Arc<dyn MessageApi>,
    outbox: ResilientOutbox,
    cache: Option<Arc<dyn MessageCache>>,
    observer: Arc<dyn SyncObserver>,
    background: Option<Arc<dyn BackgroundSync>>,
    connectivity: Connectivity,
    sync_in_progress: AtomicBool,
    in_flight: Mutex<Option<Uuid>>,
    current_user: RwLock<Option<CurrentUser>>,
    probe_interval: Duration,
    sync_interval: Duration,
    trigger_tx: mpsc::UnboundedSender<Trigger>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<Trigger>>>,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn MessageApi>, outbox: ResilientOutbox) -> Self {
        let defaults = ClientConfig::default();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        Self {
            api,
            outbox,
            cache: None,
            observer: Arc::new(TracingObserver),
            background: None,
            connectivity: Connectivity::new(true),
            sync_in_progress: AtomicBool::new(false),
            in_flight: Mutex::new(None),
            current_user: RwLock::new(None),
            probe_interval: defaults.probe_interval,
            sync_interval: defaults.sync_interval,
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
        }
    }

    /// Build an engine over HTTP and the on-disk outbox named in `config`.
    /// The returned API handle is where the caller installs the session token.
    pub async fn from_config(
        config: &ClientConfig,
        observer: Arc<dyn SyncObserver>,
    ) -> SyncResult<(Self, Arc<HttpMessageApi>)> {
        let api = Arc::new(HttpMessageApi::new(&config.api_url, config.http_timeout)?);
        let (outbox, cache) = open_outbox(&config.outbox_db_path).await;

        let engine = Self::new(api.clone(), outbox)
            .with_cache(cache)
            .with_observer(observer)
            .with_intervals(config.probe_interval, config.sync_interval);
        Ok((engine, api))
    }

    pub fn with_cache(mut self, cache: Arc<dyn MessageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_background_sync(mut self, background: Arc<dyn BackgroundSync>) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_intervals(mut self, probe: Duration, sync: Duration) -> Self {
        self.probe_interval = probe;
        self.sync_interval = sync;
        self
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            tx: self.trigger_tx.clone(),
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn set_current_user(&self, user: Option<CurrentUser>) {
        *self.current_user.write() = user;
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync_in_progress.load(Ordering::Acquire)
    }

    /// Send now if possible, otherwise persist to the outbox and return an
    /// optimistic placeholder.
    pub async fn send_with_offline_support(
        &self,
        chat_id: i64,
        payload: MessagePayload,
    ) -> SyncResult<SendOutcome> {
        if payload.is_empty() {
            return Err(SyncError::EmptyMessage);
        }

        let local_id = Uuid::new_v4();
        if self.is_online() && self.api.is_authenticated() {
            let request = SendRequest {
                payload: &payload,
                client_message_id: local_id.to_string(),
            };
            match self.api.send_message(chat_id, &request).await {
                Ok(message) => {
                    debug!(chat_id, message_id = message.id, "message delivered directly");
                    return Ok(SendOutcome::Delivered(message));
                }
                Err(e) => {
                    info!(chat_id, %local_id, error = %e, "direct send failed, queueing message");
                }
            }
        }

        self.save_for_offline(NewOutboxEntry::with_local_id(local_id, chat_id, payload))
            .await
    }

    async fn save_for_offline(&self, entry: NewOutboxEntry) -> SyncResult<SendOutcome> {
        let entry = self.outbox.enqueue(entry).await?;
        if self.outbox.take_degraded_warning() {
            self.observer.notify(&Notice::StorageDegraded);
        }

        let local = LocalMessage::from_entry(&entry, self.current_user.read().as_ref());
        self.register_background_sync().await;

        info!(chat_id = entry.chat_id, local_id = %entry.local_id, "message queued for offline delivery");
        self.observer.notify(&Notice::Queued {
            chat_id: entry.chat_id,
            local_id: entry.local_id,
        });
        Ok(SendOutcome::Queued(local))
    }

    async fn register_background_sync(&self) {
        match &self.background {
            Some(background) => match background.register(BACKGROUND_SYNC_TAG).await {
                Ok(()) => debug!(tag = BACKGROUND_SYNC_TAG, "background sync registered"),
                Err(e) => warn!(error = %e, "background sync unavailable"),
            },
            None => debug!("no background sync provider"),
        }
    }

    /// Replay the outbox once. Entries enqueued while this runs wait for the
    /// next cycle.
    pub async fn sync_pending_messages(&self) -> DrainOutcome {
        let Some(_guard) = DrainGuard::acquire(&self.sync_in_progress) else {
            debug!("drain already running");
            return DrainOutcome::AlreadyRunning;
        };
        if !self.is_online() || !self.api.is_authenticated() {
            return DrainOutcome::Skipped;
        }

        let snapshot = match self.outbox.pending().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to read outbox");
                self.observer.notify(&Notice::SyncFailed(e.to_string()));
                return DrainOutcome::Completed {
                    succeeded: 0,
                    failed: 0,
                };
            }
        };
        if let Some(e) = self.outbox.take_read_error() {
            self.observer.notify(&Notice::SyncFailed(e));
        }
        if self.outbox.take_degraded_warning() {
            self.observer.notify(&Notice::StorageDegraded);
        }
        info!(pending = snapshot.len(), "draining outbox");

        let mut succeeded = 0;
        let mut failed = 0;
        for entry in &snapshot {
            if self.deliver(entry).await {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }
        *self.in_flight.lock() = None;

        if succeeded > 0 {
            self.observer.refresh_chats().await;
        }
        if !snapshot.is_empty() {
            info!(succeeded, failed, "outbox drain finished");
            self.observer
                .notify(&Notice::SyncCompleted { succeeded, failed });
        }
        DrainOutcome::Completed { succeeded, failed }
    }

    async fn deliver(&self, entry: &OutboxEntry) -> bool {
        *self.in_flight.lock() = Some(entry.local_id);
        let request = SendRequest {
            payload: &entry.payload,
            client_message_id: entry.local_id.to_string(),
        };

        match self.api.send_message(entry.chat_id, &request).await {
            Ok(message) => {
                debug!(local_id = %entry.local_id, message_id = message.id, "outbox entry delivered");
                match self.outbox.remove(entry.local_id).await {
                    Ok(true) => {}
                    Ok(false) => warn!(local_id = %entry.local_id, "delivered entry was already gone"),
                    Err(e) => error!(
                        local_id = %entry.local_id,
                        error = %e,
                        "failed to remove delivered entry"
                    ),
                }
                true
            }
            Err(e) => {
                warn!(
                    local_id = %entry.local_id,
                    chat_id = entry.chat_id,
                    error = %e,
                    client_error = e.is_client_error(),
                    "outbox entry not delivered"
                );
                false
            }
        }
    }

    /// User-initiated retry.
    pub async fn force_sync(&self) -> DrainOutcome {
        if self.is_syncing() {
            self.observer.notify(&Notice::SyncAlreadyRunning);
            return DrainOutcome::AlreadyRunning;
        }
        self.observer.notify(&Notice::SyncStarted);
        self.sync_pending_messages().await
    }

    pub async fn handle_online(&self) -> DrainOutcome {
        if self.connectivity.set_online(true) {
            info!("connection restored");
            self.observer.notify(&Notice::BackOnline);
        }
        self.sync_pending_messages().await
    }

    pub fn handle_offline(&self) {
        if self.connectivity.set_online(false) {
            info!("connection lost");
            self.observer.notify(&Notice::WentOffline);
        }
    }

    /// Probe the server. Failure marks the client offline even when the
    /// platform reports a network.
    pub async fn check_connection(&self) {
        if !self.api.is_authenticated() {
            return;
        }
        match self.api.verify_session().await {
            Ok(()) => {
                if !self.is_online() {
                    self.handle_online().await;
                }
            }
            Err(e) => {
                if self.is_online() {
                    debug!(error = %e, "connectivity probe failed");
                    self.handle_offline();
                }
            }
        }
    }

    pub async fn status(&self) -> SyncStatus {
        let online = self.is_online();
        let sync_in_progress = self.is_syncing();
        let state = match (online, sync_in_progress) {
            (false, _) => SyncState::Offline,
            (true, true) => SyncState::OnlineDraining,
            (true, false) => SyncState::OnlineIdle,
        };
        SyncStatus {
            state,
            online,
            sync_in_progress,
            pending: self.outbox.len().await,
            degraded: self.outbox.is_degraded(),
        }
    }

    pub async fn outbox_snapshot(&self) -> SyncResult<Vec<OutboxItem>> {
        let in_flight = *self.in_flight.lock();
        let entries = self.outbox.pending().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let status = if Some(entry.local_id) == in_flight {
                    OutboxStatus::Sending
                } else {
                    OutboxStatus::Pending
                };
                OutboxItem { entry, status }
            })
            .collect())
    }

    /// Chat history, served from the local cache when the fetch fails.
    pub async fn load_messages_with_offline_support(&self, chat_id: i64) -> LoadedMessages {
        match self.api.fetch_messages(chat_id).await {
            Ok(messages) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.cache_messages(chat_id, &messages).await {
                        warn!(chat_id, error = %e, "failed to cache messages");
                    }
                }
                LoadedMessages {
                    messages,
                    from_cache: false,
                }
            }
            Err(e) => {
                debug!(chat_id, error = %e, "loading messages from cache");
                let cached = match &self.cache {
                    Some(cache) => cache.cached_messages(chat_id).await.unwrap_or_else(|e| {
                        warn!(chat_id, error = %e, "failed to read message cache");
                        None
                    }),
                    None => None,
                };
                LoadedMessages {
                    messages: cached.unwrap_or_default(),
                    from_cache: true,
                }
            }
        }
    }

    async fn handle_trigger(&self, trigger: Trigger) {
        match trigger {
            Trigger::BackgroundSync(tag) if tag == BACKGROUND_SYNC_TAG => {
                self.sync_pending_messages().await;
            }
            Trigger::BackgroundSync(tag) => debug!(%tag, "ignoring unknown sync tag"),
            Trigger::ForceSync => {
                self.force_sync().await;
            }
            Trigger::Connectivity(true) => {
                self.handle_online().await;
            }
            Trigger::Connectivity(false) => self.handle_offline(),
        }
    }

    /// Drive probes, periodic drains and platform events until `shutdown`
    /// resolves. Only one loop may run per engine.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        let receiver = self.trigger_rx.lock().take();
        let Some(mut triggers) = receiver else {
            warn!("sync loop already running");
            return;
        };

        let mut probe = interval(self.probe_interval);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut periodic = interval(self.sync_interval);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);
        probe.tick().await;
        periodic.tick().await;

        if self.is_online() {
            self.sync_pending_messages().await;
        }

        tokio::pin!(shutdown);
        info!("sync loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = probe.tick() => self.check_connection().await,
                _ = periodic.tick() => {
                    if self.is_online() {
                        self.sync_pending_messages().await;
                    }
                }
                Some(trigger) = triggers.recv() => self.handle_trigger(trigger).await,
            }
        }
        info!("sync loop stopped");
    }
}
