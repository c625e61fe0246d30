//! Offline-first messaging for the messenger client.
//!
//! Messages composed without a connection are persisted to a local SQLite
//! outbox and replayed, oldest first, once the server is reachable again.
//! The crate never installs a tracing subscriber; that belongs to the host app.

pub mod api;
pub mod background;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod store;

pub use api::{HttpMessageApi, MessageApi};
pub use background::{BackgroundSync, BACKGROUND_SYNC_TAG};
pub use config::ClientConfig;
pub use connectivity::Connectivity;
pub use engine::{SyncEngine, SyncHandle};
pub use error::{ApiError, StoreError, SyncError, SyncResult};
pub use models::{
    CurrentUser, DrainOutcome, LoadedMessages, LocalMessage, MessagePayload, OutboxItem,
    OutboxStatus, SendOutcome, ServerMessage, SyncState, SyncStatus,
};
pub use notify::{Notice, NoticeLevel, SyncObserver, TracingObserver};
pub use store::{MemoryOutboxStore, MessageCache, OutboxStore, ResilientOutbox, SqliteOutboxStore};
