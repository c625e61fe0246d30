use super::{MessageCache, OutboxStore};
use crate::error::StoreResult;
use crate::models::{NewOutboxEntry, OutboxEntry, ServerMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    next_seq: i64,
    entries: BTreeMap<i64, OutboxEntry>,
    cache: HashMap<i64, Vec<ServerMessage>>,
}

/// In-process outbox. Entries are lost on restart.
#[derive(Default)]
pub struct MemoryOutboxStore {
    state: Mutex<MemoryState>,
}

impl MemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, local_id: Uuid) -> bool {
        self.state
            .lock()
            .entries
            .values()
            .any(|e| e.local_id == local_id)
    }
}

#[async_trait]
impl OutboxStore for MemoryOutboxStore {
    async fn enqueue(&self, entry: NewOutboxEntry) -> StoreResult<OutboxEntry> {
        let mut state = self.state.lock();
        state.next_seq += 1;
        let entry = OutboxEntry::from_new(state.next_seq, entry);
        state.entries.insert(entry.seq, entry.clone());
        Ok(entry)
    }

    async fn pending(&self) -> StoreResult<Vec<OutboxEntry>> {
        Ok(self.state.lock().entries.values().cloned().collect())
    }

    async fn remove(&self, local_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock();
        let seq = state
            .entries
            .iter()
            .find(|(_, e)| e.local_id == local_id)
            .map(|(seq, _)| *seq);
        Ok(seq.and_then(|seq| state.entries.remove(&seq)).is_some())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.state.lock().entries.len())
    }
}

#[async_trait]
impl MessageCache for MemoryOutboxStore {
    async fn cache_messages(&self, chat_id: i64, messages: &[ServerMessage]) -> StoreResult<()> {
        self.state.lock().cache.insert(chat_id, messages.to_vec());
        Ok(())
    }

    async fn cached_messages(&self, chat_id: i64) -> StoreResult<Option<Vec<ServerMessage>>> {
        Ok(self.state.lock().cache.get(&chat_id).cloned())
    }
}
