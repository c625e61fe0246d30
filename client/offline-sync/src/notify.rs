//! User-facing notices and the hooks the UI implements.

use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Queued { chat_id: i64, local_id: Uuid },
    BackOnline,
    WentOffline,
    SyncStarted,
    SyncAlreadyRunning,
    SyncCompleted { succeeded: usize, failed: usize },
    StorageDegraded,
    SyncFailed(String),
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Queued { .. } | Notice::SyncStarted | Notice::SyncAlreadyRunning => {
                NoticeLevel::Info
            }
            Notice::BackOnline => NoticeLevel::Success,
            Notice::SyncCompleted { failed: 0, .. } => NoticeLevel::Success,
            Notice::SyncCompleted { .. } | Notice::WentOffline | Notice::StorageDegraded => {
                NoticeLevel::Warning
            }
            Notice::SyncFailed(_) => NoticeLevel::Error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Queued { .. } => write!(f, "Message saved, will send when back online"),
            Notice::BackOnline => write!(f, "Back online"),
            Notice::WentOffline => write!(f, "You are offline"),
            Notice::SyncStarted => write!(f, "Syncing messages..."),
            Notice::SyncAlreadyRunning => write!(f, "Sync already in progress"),
            Notice::SyncCompleted {
                succeeded,
                failed: 0,
            } => write!(f, "Sent {succeeded} message(s)"),
            Notice::SyncCompleted { succeeded, failed } => {
                write!(f, "Sent {succeeded} message(s), {failed} failed")
            }
            Notice::StorageDegraded => write!(
                f,
                "Offline storage unavailable, queued messages will be lost if the app closes"
            ),
            Notice::SyncFailed(reason) => write!(f, "Sync failed: {reason}"),
        }
    }
}

#[async_trait]
pub trait SyncObserver: Send + Sync {
    fn notify(&self, notice: &Notice);

    /// Called after a drain delivered at least one message.
    async fn refresh_chats(&self) {}
}

/// Observer that only logs; the default when no UI is attached.
#[derive(Debug, Default)]
pub struct TracingObserver;

#[async_trait]
impl SyncObserver for TracingObserver {
    fn notify(&self, notice: &Notice) {
        match notice.level() {
            NoticeLevel::Warning | NoticeLevel::Error => warn!(notice = %notice, "sync notice"),
            _ => info!(notice = %notice, "sync notice"),
        }
    }
}
