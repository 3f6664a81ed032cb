//! Store and manager fixtures
//!
//! Every fixture lives in a caller-owned temp directory so tests never share
//! state on disk.

use chatping_offline::client::local_db::LocalStore;
use chatping_offline::client::notify::{ChannelNotifier, StatusEvent};
use chatping_offline::client::offline::{OfflineManager, RemoteSink, RetryPolicy};
use chatping_offline::client::sync::SyncContext;
use chatping_offline::shared::config::{BackendPreference, StoreConfig, SyncConfig, SyncReporting};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Open a store with the given backend inside `dir`
pub async fn open_store(dir: &TempDir, backend: BackendPreference) -> Arc<LocalStore> {
    let config = StoreConfig {
        backend,
        data_dir: Some(dir.path().to_path_buf()),
    };
    Arc::new(LocalStore::open(&config).await.expect("Failed to open test store"))
}

/// Manager over `store` with immediate retries and a channel notifier
pub async fn test_manager<R: RemoteSink>(
    store: Arc<LocalStore>,
    remote: R,
    online: bool,
    reporting: SyncReporting,
) -> (OfflineManager<R>, Arc<ChannelNotifier>) {
    let notifier = Arc::new(ChannelNotifier::new(64));
    let config = SyncConfig {
        reporting,
        ..SyncConfig::default()
    };
    let manager = OfflineManager::new(
        Arc::new(SyncContext::new(online)),
        store,
        remote,
        notifier.clone(),
        &config,
    )
    .await
    .with_retry_policy(RetryPolicy::immediate());
    (manager, notifier)
}

/// Next notification message, skipping indicator updates
pub async fn next_message(rx: &mut broadcast::Receiver<StatusEvent>) -> String {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(StatusEvent::Notification(notification)) => return notification.message,
                Ok(StatusEvent::Indicators(_)) => continue,
                Err(e) => panic!("status channel failed: {}", e),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("No notification within 5s")
}
