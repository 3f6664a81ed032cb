//! # Outbox
//!
//! In-memory mirror of the persisted `sync_queue` collection. The store is
//! the source of truth; this mirror answers `pending_count` without a store
//! round-trip and is hydrated from the store at startup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::offline::queue::Outbox;
//! use chatping_offline::shared::{Category, SyncQueueItem};
//!
//! # async fn example() {
//! let outbox = Outbox::new();
//! let mut item = SyncQueueItem::new(Category::Attendance, serde_json::json!({}));
//! item.id = 1;
//! outbox.push(item).await;
//! assert_eq!(outbox.len().await, 1);
//! outbox.remove(1).await;
//! # }
//! ```

use crate::shared::{Category, RecordId, SyncQueueItem};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Queued mutations, oldest first
#[derive(Debug, Default)]
pub struct Outbox {
    items: RwLock<VecDeque<SyncQueueItem>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirror with items read from the store
    pub async fn hydrate(&self, items: Vec<SyncQueueItem>) {
        let mut queue = self.items.write().await;
        *queue = items.into();
        tracing::debug!("Outbox hydrated with {} items", queue.len());
    }

    /// Append a persisted item
    pub async fn push(&self, item: SyncQueueItem) {
        self.items.write().await.push_back(item);
    }

    /// Replace an item's retry bookkeeping
    pub async fn update(&self, item: &SyncQueueItem) {
        let mut queue = self.items.write().await;
        if let Some(slot) = queue.iter_mut().find(|queued| queued.id == item.id) {
            *slot = item.clone();
        }
    }

    /// Drop a confirmed item
    pub async fn remove(&self, id: RecordId) -> Option<SyncQueueItem> {
        let mut queue = self.items.write().await;
        let index = queue.iter().position(|item| item.id == id)?;
        queue.remove(index)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Items of one category, oldest first
    pub async fn items_for(&self, category: Category) -> Vec<SyncQueueItem> {
        self.items
            .read()
            .await
            .iter()
            .filter(|item| item.category == category)
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<SyncQueueItem> {
        self.items.read().await.iter().cloned().collect()
    }
}
