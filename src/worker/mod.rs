//! # Worker Context
//!
//! The background execution context that sits between the application and
//! the network. It runs as its own tokio task, independent of any page-side
//! [`OfflineManager`](crate::client::offline::OfflineManager), and talks to
//! the page only through [`WorkerMessage`]s and connectivity events.
//!
//! ## Architecture
//!
//! - `cache.rs`: named cache partitions
//! - `strategy.rs`: path classification and strategy table
//! - `request.rs`: intercepted and queued requests
//! - `transport.rs`: the network (`Transport` trait, `reqwest` impl)
//! - `interceptor.rs`: strategy dispatch and offline write queueing
//! - `background.rs`: background sync tags and queued request replay
//! - `proxy.rs`: axum front end (feature `proxy`)
//!
//! ## Lifecycle
//!
//! `install` reloads the offline partition from its backing file (when one
//! is set), precaches the configured assets into the versioned static
//! partition and leaves the worker waiting. `activate` deletes every other
//! partition and registers the background sync tags. A `SKIP_WAITING`
//! message activates a waiting worker immediately.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::worker::{transport::ReqwestTransport, Worker};
//! use chatping_offline::client::notify::TracingNotifier;
//! use chatping_offline::shared::config::WorkerConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new("http://127.0.0.1:3000", Duration::from_secs(30))?;
//! let worker = Arc::new(Worker::new(transport, &WorkerConfig::default(), Arc::new(TracingNotifier)));
//! worker.install().await?;
//! worker.activate().await;
//! let (handle, _task) = worker.spawn(None);
//! handle.send(chatping_offline::shared::WorkerMessage::SyncNow).await?;
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod cache;
pub mod interceptor;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod request;
pub mod strategy;
pub mod transport;

pub use background::BackgroundSync;
pub use cache::{CacheStorage, CachedResponse};
pub use interceptor::Interceptor;
pub use request::{Destination, InterceptedRequest, QueuedRequest};
pub use transport::{ReqwestTransport, Transport};

use crate::client::notify::Notifier;
use crate::shared::config::WorkerConfig;
use crate::shared::{ConnectivityEvent, InterceptError, StoreError, SyncTag, WorkerMessage};
use cache::OfflineEntryKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Offline partition file inside the data directory
pub const OFFLINE_PARTITION_FILE: &str = "offline_partition.json";

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    /// Installed, waiting to take over
    Waiting,
    Active,
}

/// Sending side of the worker's message channel
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    pub async fn send(&self, message: WorkerMessage) -> Result<(), mpsc::error::SendError<WorkerMessage>> {
        self.tx.send(message).await
    }
}

/// Request interception plus background sync
pub struct Worker<T> {
    interceptor: Interceptor<T>,
    background: BackgroundSync<T>,
    caches: Arc<CacheStorage>,
    transport: Arc<T>,
    config: WorkerConfig,
    offline_file: Option<PathBuf>,
    state: RwLock<LifecycleState>,
}

impl<T: Transport + 'static> Worker<T> {
    pub fn new(transport: T, config: &WorkerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let transport = Arc::new(transport);
        let caches = Arc::new(CacheStorage::new());
        Self {
            interceptor: Interceptor::new(transport.clone(), caches.clone(), config, notifier),
            background: BackgroundSync::new(transport.clone(), caches.clone(), config.offline_cache.clone()),
            caches,
            transport,
            config: config.clone(),
            offline_file: None,
            state: RwLock::new(LifecycleState::Installing),
        }
    }

    /// Keep the offline partition in `path` so queued writes survive a restart
    pub fn with_offline_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.offline_file = Some(path.into());
        self
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    pub fn background(&self) -> &BackgroundSync<T> {
        &self.background
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Answer an intercepted request
    pub async fn fetch(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
        self.interceptor.handle(request).await
    }

    /// Reload the offline partition and precache the configured assets
    ///
    /// Returns how many assets were cached. Fails only when the offline
    /// partition's backing file cannot be read or written.
    pub async fn install(&self) -> Result<usize, StoreError> {
        tracing::info!("Installing offline-capable worker");
        match &self.offline_file {
            Some(path) => {
                self.caches
                    .open_durable(&self.config.offline_cache, path.clone())
                    .await?;
                let pending = self.background.pending_count().await;
                if pending > 0 {
                    tracing::info!("Restored {} queued requests from {}", pending, path.display());
                }
            }
            // The offline partition exists from install on
            None => {
                self.caches.open(&self.config.offline_cache).await;
            }
        }

        let partition = self.caches.open(&self.config.static_cache).await;

        let mut cached = 0;
        for path in &self.config.precache {
            match self.transport.fetch(&InterceptedRequest::get(path.as_str())).await {
                Ok(response) if response.is_success() => {
                    match partition.put(path.as_str(), response).await {
                        Ok(()) => cached += 1,
                        Err(e) => tracing::warn!("Precache of {} not stored: {}", path, e),
                    }
                }
                Ok(response) => tracing::warn!("Precache of {} returned {}", path, response.status),
                Err(e) => tracing::warn!("Precache of {} failed: {}", path, e),
            }
        }
        *self.state.write().await = LifecycleState::Waiting;
        tracing::info!("Cached {} of {} static files", cached, self.config.precache.len());
        Ok(cached)
    }

    /// Drop stale partitions and register sync tags; returns the deleted names
    pub async fn activate(&self) -> Vec<String> {
        tracing::info!("Activating offline features");
        let mut deleted = Vec::new();
        for name in self.caches.names().await {
            if name != self.config.static_cache && name != self.config.offline_cache {
                tracing::info!("Deleting old cache {}", name);
                self.caches.delete(&name).await;
                deleted.push(name);
            }
        }

        for tag in SyncTag::ALL {
            self.background.register(tag).await;
        }
        *self.state.write().await = LifecycleState::Active;
        deleted
    }

    /// Keep a push payload for offline viewing
    pub async fn store_notification(&self, payload: serde_json::Value) -> Result<String, StoreError> {
        self.store_offline(OfflineEntryKind::Notification, payload).await
    }

    /// Keep an arbitrary payload in the offline partition
    pub async fn cache_data(&self, data: serde_json::Value) -> Result<String, StoreError> {
        self.store_offline(OfflineEntryKind::Data, data).await
    }

    async fn store_offline(&self, kind: OfflineEntryKind, value: serde_json::Value) -> Result<String, StoreError> {
        self.caches
            .open(&self.config.offline_cache)
            .await
            .put_generated(kind, CachedResponse::json(200, &value))
            .await
    }

    /// Apply one cross-context message
    pub async fn handle_message(self: &Arc<Self>, message: WorkerMessage) {
        match message {
            WorkerMessage::SkipWaiting => {
                if self.state().await == LifecycleState::Waiting {
                    self.activate().await;
                }
            }
            WorkerMessage::SyncNow => self.spawn_sync(SyncTag::General),
            WorkerMessage::Sync(tag) => self.spawn_sync(tag),
            WorkerMessage::RegisterSync(tag) => self.background.register(tag).await,
            WorkerMessage::CacheData(data) => match self.cache_data(data).await {
                Ok(key) => tracing::debug!("Cached offline data as {}", key),
                Err(e) => tracing::error!("Could not cache offline data: {}", e),
            },
            WorkerMessage::Push(payload) => match self.store_notification(payload).await {
                Ok(key) => tracing::info!("Push notification stored as {}", key),
                Err(e) => tracing::error!("Could not store push notification: {}", e),
            },
        }
    }

    fn spawn_sync(self: &Arc<Self>, tag: SyncTag) {
        let worker = self.clone();
        tokio::spawn(async move {
            worker.background.fire(tag).await;
        });
    }

    /// Start the message loop
    ///
    /// With a connectivity receiver, every online edge fires the registered
    /// background sync tags. Independently, every `replay_interval_secs` the
    /// registered tags fire while queued requests are waiting, so replay
    /// also happens with no receiver at all.
    pub fn spawn(
        self: Arc<Self>,
        mut connectivity: Option<broadcast::Receiver<ConnectivityEvent>>,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(64);
        let period = Duration::from_secs(self.config.replay_interval_secs);

        let task = tokio::spawn(async move {
            let mut replay = interval_at(Instant::now() + period, period);
            replay.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    message = rx.recv() => match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    },
                    event = next_event(&mut connectivity) => {
                        if event == ConnectivityEvent::Online {
                            self.background.fire_registered().await;
                        }
                    }
                    _ = replay.tick() => {
                        if self.background.pending_count().await > 0 {
                            tracing::debug!("Retrying queued requests");
                            self.background.fire_registered().await;
                        }
                    }
                }
            }
            tracing::debug!("Worker message loop stopped");
        });

        (WorkerHandle { tx }, task)
    }
}

/// Next connectivity event; pends forever once there is no receiver
async fn next_event(connectivity: &mut Option<broadcast::Receiver<ConnectivityEvent>>) -> ConnectivityEvent {
    loop {
        let Some(rx) = connectivity.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Ok(event) => return event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Worker missed {} connectivity events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => *connectivity = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::notify::TracingNotifier;
    use http::Method;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SwitchableOrigin {
        online: AtomicBool,
    }

    impl Transport for SwitchableOrigin {
        async fn fetch(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(CachedResponse::text(200, &format!("body of {}", request.target)))
            } else {
                Err(InterceptError::network(request.target.clone(), "offline"))
            }
        }
    }

    fn worker(online: bool) -> Arc<Worker<SwitchableOrigin>> {
        let origin = SwitchableOrigin {
            online: AtomicBool::new(online),
        };
        Arc::new(Worker::new(origin, &WorkerConfig::default(), Arc::new(TracingNotifier)))
    }

    async fn wait_until_drained(worker: &Worker<SwitchableOrigin>) {
        for _ in 0..200 {
            if worker.background().pending_count().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queued requests were never replayed");
    }

    #[tokio::test]
    async fn test_install_precaches_and_waits() {
        let worker = worker(true);
        assert_eq!(worker.install().await.unwrap(), WorkerConfig::default().precache.len());
        assert_eq!(worker.state().await, LifecycleState::Waiting);

        let cached = worker.caches().match_any("/manifest.json").await.unwrap();
        assert_eq!(cached.body, b"body of /manifest.json".to_vec());
    }

    #[tokio::test]
    async fn test_install_tolerates_failures() {
        let worker = worker(false);
        assert_eq!(worker.install().await.unwrap(), 0);
        assert_eq!(worker.state().await, LifecycleState::Waiting);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_partitions() {
        let worker = worker(true);
        worker.caches().open("chat-ping-v1.0.0").await;
        worker.install().await.unwrap();

        let deleted = worker.activate().await;
        assert_eq!(deleted, vec!["chat-ping-v1.0.0".to_string()]);
        assert_eq!(worker.state().await, LifecycleState::Active);
        assert_eq!(worker.background().registered().await, SyncTag::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_skip_waiting_activates() {
        let worker = worker(true);
        worker.install().await.unwrap();
        worker.handle_message(WorkerMessage::SkipWaiting).await;
        assert_eq!(worker.state().await, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_push_and_cache_data_are_stored() {
        let worker = worker(true);
        worker
            .handle_message(WorkerMessage::Push(serde_json::json!({"title": "Class moved"})))
            .await;
        worker
            .handle_message(WorkerMessage::CacheData(serde_json::json!({"k": 1})))
            .await;

        let offline = worker.caches().open("chat-ping-offline-v1").await;
        assert_eq!(offline.entries_of(OfflineEntryKind::Notification).await.len(), 1);
        assert_eq!(offline.entries_of(OfflineEntryKind::Data).await.len(), 1);
    }

    #[tokio::test]
    async fn test_online_edge_replays_queued_writes() {
        let worker = worker(false);
        worker.activate().await;
        let queued = worker
            .fetch(&InterceptedRequest::new(Method::POST, "/api/attendance/checkin").with_body("{}"))
            .await
            .unwrap();
        assert_eq!(queued.status, 202);
        assert_eq!(worker.background().pending_count().await, 1);

        let (events, rx) = broadcast::channel(4);
        let (_handle, _task) = worker.clone().spawn(Some(rx));

        worker.transport.online.store(true, Ordering::SeqCst);
        events.send(ConnectivityEvent::Online).unwrap();

        wait_until_drained(&worker).await;
    }

    #[tokio::test]
    async fn test_sync_now_message() {
        let worker = worker(false);
        worker
            .fetch(&InterceptedRequest::new(Method::DELETE, "/api/chat/1"))
            .await
            .unwrap();
        worker.transport.online.store(true, Ordering::SeqCst);

        let (handle, _task) = worker.clone().spawn(None);
        handle.send(WorkerMessage::SyncNow).await.unwrap();

        wait_until_drained(&worker).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_timer_drains_queue_without_connectivity() {
        let worker = worker(false);
        worker.activate().await;
        worker
            .fetch(&InterceptedRequest::new(Method::POST, "/api/chat/send").with_body("hi"))
            .await
            .unwrap();

        let (_handle, _task) = worker.clone().spawn(None);
        worker.transport.online.store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(worker.background().pending_count().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_until_drained(&worker).await;
    }

    #[tokio::test]
    async fn test_queued_writes_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(OFFLINE_PARTITION_FILE);
        let restarted = |online: bool| {
            let origin = SwitchableOrigin {
                online: AtomicBool::new(online),
            };
            Worker::new(origin, &WorkerConfig::default(), Arc::new(TracingNotifier)).with_offline_file(&file)
        };

        let first = restarted(false);
        first.install().await.unwrap();
        let ack = first
            .fetch(&InterceptedRequest::new(Method::PUT, "/api/attendance/checkin").with_body("{}"))
            .await
            .unwrap();
        assert_eq!(ack.status, 202);
        drop(first);

        let second = restarted(true);
        second.install().await.unwrap();
        assert_eq!(second.background().pending_count().await, 1);
        second.activate().await;
        second.background().fire_registered().await;
        assert_eq!(second.background().pending_count().await, 0);
        drop(second);

        let third = restarted(true);
        third.install().await.unwrap();
        assert_eq!(third.background().pending_count().await, 0);
    }
}
