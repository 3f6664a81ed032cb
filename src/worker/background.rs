//! # Background Sync
//!
//! Replays requests queued by the interceptor when a sync tag fires. Runs
//! inside the worker, so it works with no page-side manager alive.
//!
//! ## Tags
//!
//! | Tag | Replays |
//! |-----|---------|
//! | `attendance-sync` | queued requests whose target mentions attendance |
//! | `notification-sync` | ... notifications |
//! | `user-data-sync` | ... `/user` |
//! | `general-sync` | every queued request, uncategorised included |
//!
//! Replays are serialized: firing all registered tags runs the category tags
//! first and `general-sync` last, so no request is sent twice.

use crate::client::offline::reconciliation::{replay_all, BatchReport, ReplaySource};
use crate::shared::{SyncError, SyncTag};
use crate::worker::cache::{CachePartition, CacheStorage, OfflineEntryKind};
use crate::worker::request::QueuedRequest;
use crate::worker::transport::Transport;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A queued request with the key it is stored under
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedUnit {
    pub key: String,
    pub request: QueuedRequest,
}

/// Worker-side replay source over the offline partition
pub struct QueuedRequestOutbox<'a, T> {
    partition: Arc<CachePartition>,
    transport: &'a T,
}

impl<'a, T: Transport> QueuedRequestOutbox<'a, T> {
    pub fn new(partition: Arc<CachePartition>, transport: &'a T) -> Self {
        Self { partition, transport }
    }

    /// Every decodable queued request, oldest first
    pub async fn queued(&self) -> Vec<QueuedUnit> {
        let mut units = Vec::new();
        for (key, response) in self.partition.entries_of(OfflineEntryKind::Request).await {
            match serde_json::from_slice::<QueuedRequest>(&response.body) {
                Ok(request) => units.push(QueuedUnit { key, request }),
                Err(e) => tracing::warn!("Skipping malformed queued request {}: {}", key, e),
            }
        }
        units
    }
}

impl<T: Transport> ReplaySource for QueuedRequestOutbox<'_, T> {
    type Partition = SyncTag;
    type Unit = QueuedUnit;

    async fn pending(&self, tag: SyncTag) -> Result<Vec<QueuedUnit>, SyncError> {
        let units = self.queued().await;
        Ok(match tag.category() {
            None => units,
            Some(category) => units
                .into_iter()
                .filter(|unit| unit.request.category() == Some(category))
                .collect(),
        })
    }

    async fn deliver(&self, unit: &QueuedUnit) -> Result<(), SyncError> {
        let request = unit
            .request
            .to_request()
            .map_err(|e| SyncError::transport(format!("{}: {}", unit.key, e)))?;
        let response = self
            .transport
            .fetch(&request)
            .await
            .map_err(|e| SyncError::transport(e.to_string()))?;

        if !response.is_success() {
            return Err(SyncError::status(response.status, unit.request.target.clone()));
        }
        Ok(())
    }

    async fn retire(&self, unit: &QueuedUnit) -> Result<(), SyncError> {
        self.partition.delete(&unit.key).await?;
        tracing::debug!("Replayed and discarded {}", unit.key);
        Ok(())
    }

    async fn defer(&self, unit: &QueuedUnit, error: &SyncError) -> Result<(), SyncError> {
        tracing::debug!("Keeping {} for the next sync: {}", unit.key, error);
        Ok(())
    }
}

/// Tag registry and replay driver
pub struct BackgroundSync<T> {
    transport: Arc<T>,
    caches: Arc<CacheStorage>,
    offline_cache: String,
    registered: RwLock<Vec<SyncTag>>,
    replay_lock: Mutex<()>,
}

impl<T: Transport> BackgroundSync<T> {
    pub fn new(transport: Arc<T>, caches: Arc<CacheStorage>, offline_cache: impl Into<String>) -> Self {
        Self {
            transport,
            caches,
            offline_cache: offline_cache.into(),
            registered: RwLock::new(Vec::new()),
            replay_lock: Mutex::new(()),
        }
    }

    /// Register a tag; repeated registrations are ignored
    pub async fn register(&self, tag: SyncTag) {
        let mut registered = self.registered.write().await;
        if !registered.contains(&tag) {
            tracing::debug!("Registered background sync {}", tag);
            registered.push(tag);
        }
    }

    pub async fn registered(&self) -> Vec<SyncTag> {
        self.registered.read().await.clone()
    }

    /// Run one tag's replay
    pub async fn fire(&self, tag: SyncTag) -> BatchReport {
        let _serialized = self.replay_lock.lock().await;
        tracing::info!("Background sync triggered - {}", tag);

        let partition = self.caches.open(&self.offline_cache).await;
        let source = QueuedRequestOutbox::new(partition, self.transport.as_ref());
        let report = replay_all(&source, &[tag]).await;

        if report.totals.attempted > 0 {
            tracing::info!(
                "{}: {} replayed, {} failed",
                tag,
                report.totals.succeeded,
                report.totals.failed
            );
        }
        report
    }

    /// Fire every registered tag, `general-sync` last
    pub async fn fire_registered(&self) -> Vec<(SyncTag, BatchReport)> {
        let mut tags = self.registered().await;
        tags.sort_by_key(|tag| *tag == SyncTag::General);

        let mut reports = Vec::with_capacity(tags.len());
        for tag in tags {
            reports.push((tag, self.fire(tag).await));
        }
        reports
    }

    /// Queued requests still waiting for replay
    pub async fn pending_count(&self) -> usize {
        match self.caches.get(&self.offline_cache).await {
            Some(partition) => partition.entries_of(OfflineEntryKind::Request).await.len(),
            None => 0,
        }
    }
}
