use super::{MemoryOutboxStore, OutboxStore};
use crate::error::StoreResult;
use crate::models::{NewOutboxEntry, OutboxEntry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Outbox that prefers the durable store and degrades to memory when the
/// durable store fails, so a write is never dropped silently.
///
/// Once degraded, new entries go to memory for the rest of the process.
/// Entries already in the durable store remain visible and deliverable.
/// A failed durable read also degrades the outbox and is kept for
/// [`ResilientOutbox::take_read_error`].
pub struct ResilientOutbox {
    durable: Option<Arc<dyn OutboxStore>>,
    fallback: MemoryOutboxStore,
    degraded: AtomicBool,
    warning_pending: AtomicBool,
    read_error: Mutex<Option<String>>,
}

impl ResilientOutbox {
    pub fn new(durable: Arc<dyn OutboxStore>) -> Self {
        Self {
            durable: Some(durable),
            fallback: MemoryOutboxStore::new(),
            degraded: AtomicBool::new(false),
            warning_pending: AtomicBool::new(false),
            read_error: Mutex::new(None),
        }
    }

    /// No durable store could be opened at all.
    pub fn memory_only() -> Self {
        Self {
            durable: None,
            fallback: MemoryOutboxStore::new(),
            degraded: AtomicBool::new(true),
            warning_pending: AtomicBool::new(true),
            read_error: Mutex::new(None),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// True exactly once after the outbox degraded.
    pub fn take_degraded_warning(&self) -> bool {
        self.warning_pending.swap(false, Ordering::AcqRel)
    }

    /// Durable read failure from the last [`ResilientOutbox::pending`] call.
    pub fn take_read_error(&self) -> Option<String> {
        self.read_error.lock().take()
    }

    fn degrade(&self) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            self.warning_pending.store(true, Ordering::Release);
        }
    }

    fn durable(&self) -> Option<&Arc<dyn OutboxStore>> {
        if self.is_degraded() {
            None
        } else {
            self.durable.as_ref()
        }
    }

    pub async fn enqueue(&self, entry: NewOutboxEntry) -> StoreResult<OutboxEntry> {
        if let Some(durable) = self.durable() {
            match durable.enqueue(entry.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(e) => {
                    error!(error = %e, local_id = %entry.local_id, "durable outbox write failed, falling back to memory");
                    self.degrade();
                }
            }
        }
        self.fallback.enqueue(entry).await
    }

    /// Durable entries first, then entries written after degrading, each in
    /// enqueue order.
    pub async fn pending(&self) -> StoreResult<Vec<OutboxEntry>> {
        let (entries, read_error) = self.collect().await?;
        *self.read_error.lock() = read_error;
        Ok(entries)
    }

    async fn collect(&self) -> StoreResult<(Vec<OutboxEntry>, Option<String>)> {
        let mut entries = Vec::new();
        let mut read_error = None;
        if let Some(durable) = &self.durable {
            match durable.pending().await {
                Ok(stored) => entries = stored,
                Err(e) => {
                    error!(error = %e, "durable outbox read failed, stored entries skipped");
                    self.degrade();
                    read_error = Some(e.to_string());
                }
            }
        }
        entries.extend(self.fallback.pending().await?);
        Ok((entries, read_error))
    }

    pub async fn remove(&self, local_id: Uuid) -> StoreResult<bool> {
        if self.fallback.contains(local_id) {
            return self.fallback.remove(local_id).await;
        }
        match &self.durable {
            Some(durable) => durable.remove(local_id).await,
            None => Ok(false),
        }
    }

    pub async fn len(&self) -> usize {
        match self.collect().await {
            Ok((entries, _)) => entries.len(),
            Err(e) => {
                warn!(error = %e, "outbox length unavailable");
                0
            }
        }
    }
}
