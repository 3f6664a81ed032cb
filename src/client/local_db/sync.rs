//! # Outbox Persistence
//!
//! Typed access to offline records and queued mutations on top of the
//! backend-neutral [`LocalStore`] contract.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::local_db::LocalStore;
//! use chatping_offline::shared::{Category, SyncQueueItem};
//!
//! # async fn example(store: LocalStore) -> Result<(), chatping_offline::shared::StoreError> {
//! let item = SyncQueueItem::new(Category::Attendance, serde_json::json!({"present": true}));
//! let id = store.push_queue_item(&item).await?;
//!
//! for item in store.queue_items().await? {
//!     // Replay item...
//!     store.delete_queue_item(item.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::{Collection, LocalStore, Result, StoredRow};
use crate::shared::{Category, OfflineRecord, RecordId, SyncQueueItem};
use serde::de::DeserializeOwned;

/// Decode rows, skipping (and logging) values that no longer match the model
fn decode_rows<T: DeserializeOwned>(
    collection: Collection,
    rows: Vec<StoredRow>,
    mut assign_id: impl FnMut(&mut T, RecordId),
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row.value) {
            Ok(mut value) => {
                assign_id(&mut value, row.id);
                decoded.push(value);
            }
            Err(e) => tracing::warn!("Skipping malformed {} #{}: {}", collection.name(), row.id, e),
        }
    }
    decoded
}

impl LocalStore {
    /// Persist an offline record in its category collection
    pub async fn store_record(&self, record: &OfflineRecord) -> Result<RecordId> {
        let value = serde_json::to_value(record)?;
        self.put(Collection::Records(record.category), &value).await
    }

    /// Every record of a category, oldest first
    pub async fn records(&self, category: Category) -> Result<Vec<OfflineRecord>> {
        let collection = Collection::Records(category);
        let rows = self.try_get_all(collection).await?;
        Ok(decode_rows(collection, rows, |record: &mut OfflineRecord, id| {
            record.id = id
        }))
    }

    /// Delete a record once the remote confirmed it
    pub async fn delete_record(&self, category: Category, id: RecordId) -> Result<()> {
        self.remove(Collection::Records(category), id).await
    }

    /// Flag a record as confirmed so it is never resent
    pub async fn mark_record_synced(&self, record: &OfflineRecord) -> Result<()> {
        let mut synced = record.clone();
        synced.synced = true;
        let value = serde_json::to_value(&synced)?;
        self.replace(Collection::Records(record.category), record.id, &value).await
    }

    /// Persist a queued mutation
    pub async fn push_queue_item(&self, item: &SyncQueueItem) -> Result<RecordId> {
        let value = serde_json::to_value(item)?;
        self.put(Collection::SyncQueue, &value).await
    }

    /// Every queued mutation, oldest first
    pub async fn queue_items(&self) -> Result<Vec<SyncQueueItem>> {
        let rows = self.try_get_all(Collection::SyncQueue).await?;
        Ok(decode_rows(Collection::SyncQueue, rows, |item: &mut SyncQueueItem, id| {
            item.id = id
        }))
    }

    /// Persist retry bookkeeping for a queued mutation
    pub async fn update_queue_item(&self, item: &SyncQueueItem) -> Result<()> {
        let value = serde_json::to_value(item)?;
        self.replace(Collection::SyncQueue, item.id, &value).await
    }

    /// Delete a queued mutation once the remote confirmed it
    pub async fn delete_queue_item(&self, id: RecordId) -> Result<()> {
        self.remove(Collection::SyncQueue, id).await
    }

    /// Number of persisted queued mutations
    pub async fn queue_len(&self) -> Result<usize> {
        self.count(Collection::SyncQueue).await
    }
}
