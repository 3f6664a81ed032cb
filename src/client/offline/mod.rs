//! # Offline Sync Engine
//!
//! Keeps the client usable without connectivity: every state-changing action
//! is written to a durable outbox first and replayed against the remote
//! endpoint once the connection is back.
//!
//! ## Architecture
//!
//! - `queue.rs`: in-memory mirror of the persisted sync queue
//! - `retry.rs`: backoff deciding when a failed item is due again
//! - `remote.rs`: the remote write endpoint (`RemoteSink`)
//! - `reconciliation.rs`: the shared replay loop and the store adapter
//!
//! [`OfflineManager`] ties these to the shared [`SyncContext`], the
//! [`NetworkMonitor`] and the notification bridge.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::offline::{remote::HttpRemote, OfflineManager};
//! use chatping_offline::client::{local_db::LocalStore, notify::TracingNotifier, Config};
//! use chatping_offline::client::sync::SyncContext;
//! use chatping_offline::shared::Category;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let store = Arc::new(LocalStore::open(config.store()).await?);
//! let remote = HttpRemote::new(&config)?;
//! let manager = OfflineManager::new(
//!     Arc::new(SyncContext::new(true)),
//!     store,
//!     remote,
//!     Arc::new(TracingNotifier),
//!     config.sync(),
//! )
//! .await;
//!
//! manager.enqueue(Category::Attendance, serde_json::json!({"present": true})).await?;
//! manager.set_online(false).await;
//! manager.set_online(true).await; // replays the outbox
//! # Ok(())
//! # }
//! ```

pub mod queue;
pub mod reconciliation;
pub mod remote;
pub mod retry;

pub use queue::Outbox;
pub use reconciliation::{BatchReport, ReconcileOutcome, ReplayReport, ReplaySource};
pub use remote::{HttpRemote, RemoteSink};
pub use retry::{BackoffStrategy, RetryPolicy};

use crate::client::local_db::LocalStore;
use crate::client::notify::{
    Notifier, Severity, OFFLINE_NOTICE_MESSAGE, SYNC_FAILURE_MESSAGE, SYNC_SUCCESS_MESSAGE,
};
use crate::client::sync::{NetworkMonitor, OfflineStatus, SyncContext};
use crate::shared::config::{SyncConfig, SyncReporting};
use crate::shared::{Category, ConnectivityEvent, OfflineRecord, RecordId, StoreError, SyncQueueItem};
use reconciliation::{replay_all, StoreOutbox};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Main offline manager coordinating outbox, connectivity and replay
pub struct OfflineManager<R> {
    /// Shared connectivity and single-flight state
    ctx: Arc<SyncContext>,
    /// Durable storage for records and queued mutations
    store: Arc<LocalStore>,
    /// Remote write endpoint
    remote: R,
    /// User-facing status bridge
    notifier: Arc<dyn Notifier>,
    /// Edge detection for connectivity signals
    monitor: NetworkMonitor,
    /// In-memory mirror of the sync queue
    outbox: Outbox,
    /// When failed queue items are due again
    retry: RetryPolicy,
    /// How a finished batch is reported
    reporting: SyncReporting,
}

impl<R: RemoteSink> OfflineManager<R> {
    /// Create a manager and hydrate the outbox from the store
    pub async fn new(
        ctx: Arc<SyncContext>,
        store: Arc<LocalStore>,
        remote: R,
        notifier: Arc<dyn Notifier>,
        config: &SyncConfig,
    ) -> Self {
        let monitor = NetworkMonitor::new(ctx.clone(), notifier.clone());
        let manager = Self {
            ctx,
            store,
            remote,
            notifier,
            monitor,
            outbox: Outbox::new(),
            retry: RetryPolicy::from_config(&config.retry),
            reporting: config.reporting,
        };

        if let Err(e) = manager.hydrate().await {
            tracing::warn!("Could not load pending sync queue: {}", e);
        }
        manager.monitor.refresh_indicators();
        manager
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reload the in-memory outbox from the store
    pub async fn hydrate(&self) -> Result<usize, StoreError> {
        let items = self.store.queue_items().await?;
        let count = items.len();
        self.outbox.hydrate(items).await;
        Ok(count)
    }

    /// Check if the system is currently online
    pub fn is_online(&self) -> bool {
        self.ctx.is_online()
    }

    pub fn sync_in_progress(&self) -> bool {
        self.ctx.sync_in_progress()
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Subscribe to connectivity edges
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.monitor.subscribe()
    }

    /// Persist a mutation; when online, try to replay right away
    pub async fn enqueue(&self, category: Category, data: serde_json::Value) -> Result<RecordId, StoreError> {
        let mut item = SyncQueueItem::new(category, data);
        item.id = self.store.push_queue_item(&item).await?;
        let id = item.id;
        self.outbox.push(item).await;
        tracing::debug!("Queued {} mutation #{}", category, id);

        if self.is_online() {
            self.reconcile().await;
        }
        Ok(id)
    }

    /// Persist an unsynced offline record
    pub async fn store_offline_data(
        &self,
        category: Category,
        payload: serde_json::Value,
    ) -> Result<RecordId, StoreError> {
        let record = OfflineRecord::new(category, payload);
        let id = self.store.store_record(&record).await?;
        tracing::debug!("Stored offline {} record #{}", category, id);
        Ok(id)
    }

    /// Offline records of a category; empty if the store cannot be read
    pub async fn offline_data(&self, category: Category) -> Vec<OfflineRecord> {
        match self.store.records(category).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Failed to read offline {} records: {}", category, e);
                Vec::new()
            }
        }
    }

    /// Run one reconciliation batch unless offline or already syncing
    pub async fn reconcile(&self) -> ReconcileOutcome {
        if !self.ctx.is_online() {
            tracing::debug!("Skipping sync while offline");
            return ReconcileOutcome::Skipped;
        }
        let Some(guard) = self.ctx.try_begin_sync() else {
            tracing::debug!("Sync already in progress");
            return ReconcileOutcome::Skipped;
        };

        tracing::info!("Starting offline data sync");
        let source = StoreOutbox::new(&self.store, &self.remote, &self.outbox, &self.retry);
        let report = replay_all(&source, &Category::ALL).await;
        drop(guard);

        self.announce(&report);
        ReconcileOutcome::Completed(report)
    }

    fn announce(&self, report: &BatchReport) {
        if report.is_empty() {
            tracing::debug!("Nothing to sync");
            return;
        }

        tracing::info!(
            attempted = report.totals.attempted,
            succeeded = report.totals.succeeded,
            failed = report.totals.failed,
            "Offline data sync finished"
        );
        if report.is_success(self.reporting) {
            self.notifier.notify(SYNC_SUCCESS_MESSAGE, Severity::Success);
        } else {
            self.notifier.notify(SYNC_FAILURE_MESSAGE, Severity::Error);
        }
    }

    /// User-requested sync
    pub async fn manual_sync(&self) -> ReconcileOutcome {
        if self.is_online() {
            self.reconcile().await
        } else {
            self.notifier.notify(OFFLINE_NOTICE_MESSAGE, Severity::Info);
            ReconcileOutcome::Skipped
        }
    }

    /// Feed a platform connectivity signal; an online edge triggers a sync
    pub async fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        let edge = self.monitor.transition(online);
        if edge == Some(ConnectivityEvent::Online) {
            self.reconcile().await;
        }
        edge
    }

    pub async fn offline_status(&self) -> OfflineStatus {
        OfflineStatus {
            is_online: self.ctx.is_online(),
            sync_in_progress: self.ctx.sync_in_progress(),
            pending_count: self.outbox.len().await,
        }
    }

    /// Reconcile if the persisted queue has anything in it
    pub async fn check_pending_syncs(&self) -> Option<ReconcileOutcome> {
        let count = match self.store.queue_len().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Could not count pending sync items: {}", e);
                return None;
            }
        };
        if count == 0 {
            return None;
        }

        tracing::info!("Found {} pending sync items", count);
        Some(self.reconcile().await)
    }
}

impl<R> std::fmt::Debug for OfflineManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineManager")
            .field("ctx", &self.ctx)
            .field("store", &self.store.backend_kind())
            .field("reporting", &self.reporting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local_db::KeyValueStore;
    use crate::client::notify::{ChannelNotifier, StatusEvent};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRemote {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RemoteSink for CountingRemote {
        async fn push(&self, category: Category, _payload: &serde_json::Value) -> Result<(), crate::shared::SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::shared::SyncError::status(503, category.sync_path()));
            }
            Ok(())
        }
    }

    async fn manager(
        dir: &tempfile::TempDir,
        online: bool,
        remote: CountingRemote,
    ) -> (OfflineManager<CountingRemote>, Arc<ChannelNotifier>) {
        let store = KeyValueStore::open(dir.path().join("kv.json")).await.unwrap();
        let notifier = Arc::new(ChannelNotifier::new(32));
        let manager = OfflineManager::new(
            Arc::new(SyncContext::new(online)),
            Arc::new(LocalStore::from_key_value(store)),
            remote,
            notifier.clone(),
            &SyncConfig::default(),
        )
        .await
        .with_retry_policy(RetryPolicy::immediate());
        (manager, notifier)
    }

    async fn next_notification(rx: &mut broadcast::Receiver<StatusEvent>) -> String {
        loop {
            if let StatusEvent::Notification(n) = rx.recv().await.unwrap() {
                return n.message;
            }
        }
    }

    #[tokio::test]
    async fn test_enqueue_offline_keeps_item() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir, false, CountingRemote::default()).await;

        manager.enqueue(Category::Attendance, json!({"present": true})).await.unwrap();

        let status = manager.offline_status().await;
        assert!(!status.is_online);
        assert_eq!(status.pending_count, 1);
        assert_eq!(manager.remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enqueue_online_replays_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, notifier) = manager(&dir, true, CountingRemote::default()).await;
        let mut rx = notifier.subscribe();

        manager.enqueue(Category::Notification, json!({"id": 4})).await.unwrap();

        assert_eq!(manager.remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.offline_status().await.pending_count, 0);
        assert_eq!(next_notification(&mut rx).await, SYNC_SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_manual_sync_offline_only_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, notifier) = manager(&dir, false, CountingRemote::default()).await;
        let mut rx = notifier.subscribe();

        assert_eq!(manager.manual_sync().await, ReconcileOutcome::Skipped);
        assert_eq!(next_notification(&mut rx).await, OFFLINE_NOTICE_MESSAGE);
    }

    #[tokio::test]
    async fn test_hydrate_counts_persisted_items() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (manager, _) = manager(&dir, false, CountingRemote::default()).await;
            manager.enqueue(Category::UserProfile, json!({"a": 1})).await.unwrap();
            manager.enqueue(Category::UserProfile, json!({"a": 2})).await.unwrap();
        }

        let (reopened, _) = manager(&dir, false, CountingRemote::default()).await;
        assert_eq!(reopened.offline_status().await.pending_count, 2);
    }

    #[tokio::test]
    async fn test_check_pending_syncs() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir, true, CountingRemote { fail: true, ..Default::default() }).await;
        assert!(manager.check_pending_syncs().await.is_none());

        manager.enqueue(Category::Attendance, json!({})).await.unwrap();
        let outcome = manager.check_pending_syncs().await.unwrap();
        assert_eq!(outcome.report().unwrap().totals.failed, 1);
        assert_eq!(manager.store().queue_items().await.unwrap()[0].retry_count, 2);
    }

    #[tokio::test]
    async fn test_offline_data_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir, false, CountingRemote::default()).await;

        manager
            .store_offline_data(Category::Attendance, json!({"student": 1}))
            .await
            .unwrap();
        let records = manager.offline_data(Category::Attendance).await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].synced);
    }
}
