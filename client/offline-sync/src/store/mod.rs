//! Outbox and message-cache storage.
//!
//! - [`SqliteOutboxStore`]: durable, survives restarts
//! - [`MemoryOutboxStore`]: process-local, used as fallback and in tests
//! - [`ResilientOutbox`]: durable store with automatic memory fallback

mod memory;
mod resilient;
mod sqlite;

pub use memory::MemoryOutboxStore;
pub use resilient::ResilientOutbox;
pub use sqlite::SqliteOutboxStore;

use crate::error::StoreResult;
use crate::models::{NewOutboxEntry, OutboxEntry, ServerMessage};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persist an entry and return it with its assigned sequence number.
    async fn enqueue(&self, entry: NewOutboxEntry) -> StoreResult<OutboxEntry>;

    /// All entries in enqueue order (`seq`).
    async fn pending(&self) -> StoreResult<Vec<OutboxEntry>>;

    /// Delete after confirmed delivery. Returns whether the entry existed.
    async fn remove(&self, local_id: Uuid) -> StoreResult<bool>;

    async fn len(&self) -> StoreResult<usize>;

    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Last fetched history per chat, served when the network is unavailable.
#[async_trait]
pub trait MessageCache: Send + Sync {
    /// Replace the cached history of a chat.
    async fn cache_messages(&self, chat_id: i64, messages: &[ServerMessage]) -> StoreResult<()>;

    async fn cached_messages(&self, chat_id: i64) -> StoreResult<Option<Vec<ServerMessage>>>;
}

/// Open the on-disk outbox, or a degraded memory-only outbox when the
/// database cannot be opened. The same store backs the message cache.
pub async fn open_outbox(path: &Path) -> (ResilientOutbox, Arc<dyn MessageCache>) {
    match SqliteOutboxStore::open(path).await {
        Ok(store) => {
            let store = Arc::new(store);
            (ResilientOutbox::new(store.clone()), store)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot open outbox database, using memory");
            (ResilientOutbox::memory_only(), Arc::new(MemoryOutboxStore::new()))
        }
    }
}
