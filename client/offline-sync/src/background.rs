use crate::error::SyncResult;
use async_trait::async_trait;

pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Platform hook that wakes the app later to drain the outbox. Delivery comes
/// back through [`crate::SyncHandle::background_sync`].
#[async_trait]
pub trait BackgroundSync: Send + Sync {
    async fn register(&self, tag: &str) -> SyncResult<()>;
}
