//! Outbox replay against a mock sync endpoint

use crate::common::*;
use chatping_offline::client::local_db::{LocalStore, SqliteStore, SQLITE_FILE};
use chatping_offline::client::notify::{StatusEvent, SYNC_FAILURE_MESSAGE, SYNC_SUCCESS_MESSAGE};
use chatping_offline::client::offline::ReconcileOutcome;
use chatping_offline::client::sync::SyncScheduler;
use chatping_offline::shared::config::{BackendPreference, SyncConfig, SyncReporting};
use chatping_offline::shared::{Category, ConnectivityEvent};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_online_edge_replays_each_attendance_record_once() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200)).await;
    let store = open_store(&dir, BackendPreference::Sqlite).await;
    let (manager, _notifier) = test_manager(store, http_remote(&server), false, SyncReporting::Batch).await;

    for student in 0..3 {
        manager
            .store_offline_data(Category::Attendance, json!({"student": student, "present": true}))
            .await
            .unwrap();
    }
    assert!(received_paths(&server).await.is_empty());

    assert_eq!(manager.set_online(true).await, Some(ConnectivityEvent::Online));
    assert_eq!(received_paths(&server).await, vec!["/api/attendance/sync"; 3]);
    assert!(manager.offline_data(Category::Attendance).await.is_empty());

    // Replaying again sends nothing new
    let outcome = manager.reconcile().await;
    assert!(outcome.report().unwrap().is_empty());
    assert_eq!(received_paths(&server).await.len(), 3);
}

#[tokio::test]
async fn test_repeated_online_signal_is_not_an_edge() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200)).await;
    let store = open_store(&dir, BackendPreference::KeyValue).await;
    let (manager, _notifier) = test_manager(store, http_remote(&server), true, SyncReporting::Batch).await;

    manager
        .store_offline_data(Category::Notification, json!({"read": 4}))
        .await
        .unwrap();
    assert_eq!(manager.set_online(true).await, None);
    assert!(received_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_reconcile_is_single_flight() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200).set_delay(Duration::from_millis(200))).await;
    let store = open_store(&dir, BackendPreference::Sqlite).await;
    let (manager, _notifier) = test_manager(store, http_remote(&server), true, SyncReporting::Batch).await;

    manager
        .store_offline_data(Category::Attendance, json!({"student": 1}))
        .await
        .unwrap();
    manager
        .store_offline_data(Category::UserProfile, json!({"name": "Ada"}))
        .await
        .unwrap();

    let (first, second) = tokio::join!(manager.reconcile(), manager.reconcile());
    assert!(matches!(first, ReconcileOutcome::Completed(_)));
    assert_eq!(second, ReconcileOutcome::Skipped);
    assert!(!manager.sync_in_progress());
    assert_eq!(received_paths(&server).await.len(), 2);
}

#[tokio::test]
async fn test_timer_manual_and_online_triggers_share_one_batch() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200).set_delay(Duration::from_millis(2_500))).await;
    let store = open_store(&dir, BackendPreference::Sqlite).await;
    let (manager, notifier) = test_manager(store, http_remote(&server), false, SyncReporting::Batch).await;
    let manager = Arc::new(manager);
    let mut rx = notifier.subscribe();

    manager
        .enqueue(Category::Attendance, json!({"student": 4, "present": true}))
        .await
        .unwrap();
    manager
        .store_offline_data(Category::Notification, json!({"id": 8, "read": true}))
        .await
        .unwrap();

    let config = SyncConfig {
        fast_interval_secs: 1,
        pending_check_interval_secs: 1,
        ..SyncConfig::default()
    };
    let scheduler = SyncScheduler::start(manager.clone(), &config);

    let manual = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        manager.manual_sync().await
    };
    let (edge, manual) = tokio::join!(manager.set_online(true), manual);
    assert_eq!(edge, Some(ConnectivityEvent::Online));
    assert_eq!(manual, ReconcileOutcome::Skipped);

    // A couple more ticks with nothing left to send
    tokio::time::sleep(Duration::from_millis(2_200)).await;
    drop(scheduler);

    assert_eq!(received_paths(&server).await.len(), 2);
    assert!(!manager.sync_in_progress());

    let mut announced = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let StatusEvent::Notification(notification) = event {
            announced.push(notification.message);
        }
    }
    assert_eq!(announced, vec![SYNC_SUCCESS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_unlistable_store_announces_batch_failure() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200)).await;
    let sqlite = SqliteStore::open(&dir.path().join(SQLITE_FILE)).await.unwrap();
    let pool = sqlite.pool().clone();
    let store = Arc::new(LocalStore::from_sqlite(sqlite));
    let (manager, notifier) = test_manager(store, http_remote(&server), true, SyncReporting::Batch).await;
    let mut rx = notifier.subscribe();

    sqlx::query("DROP TABLE offline_store").execute(&pool).await.unwrap();
    let outcome = manager.reconcile().await;

    let report = outcome.report().unwrap();
    assert_eq!(report.errors.len(), Category::ALL.len());
    assert_eq!(report.totals.attempted, 0);
    assert_eq!(next_message(&mut rx).await, SYNC_FAILURE_MESSAGE);
    assert!(!manager.sync_in_progress());
    assert!(received_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_rejected_item_stays_queued_with_retry_count() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(500)).await;
    let store = open_store(&dir, BackendPreference::Sqlite).await;
    let (manager, notifier) = test_manager(store.clone(), http_remote(&server), false, SyncReporting::Batch).await;
    let mut rx = notifier.subscribe();

    manager
        .enqueue(Category::Attendance, json!({"student": 9, "present": false}))
        .await
        .unwrap();
    manager.set_online(true).await;

    let items = store.queue_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].retry_count, 1);
    assert!(items[0].last_error.as_deref().unwrap().contains("500"));

    // Item failures are silent in batch mode
    assert_eq!(next_message(&mut rx).await, SYNC_SUCCESS_MESSAGE);

    manager.reconcile().await;
    assert_eq!(store.queue_items().await.unwrap()[0].retry_count, 2);
    assert_eq!(manager.offline_status().await.pending_count, 1);
}

#[tokio::test]
async fn test_per_item_reporting_announces_failure() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(503)).await;
    let store = open_store(&dir, BackendPreference::KeyValue).await;
    let (manager, notifier) = test_manager(store, http_remote(&server), true, SyncReporting::PerItem).await;
    let mut rx = notifier.subscribe();

    manager
        .store_offline_data(Category::Notification, json!({"id": 12, "read": true}))
        .await
        .unwrap();
    let outcome = manager.manual_sync().await;

    assert_eq!(outcome.report().unwrap().totals.failed, 1);
    assert_eq!(next_message(&mut rx).await, SYNC_FAILURE_MESSAGE);
    assert_eq!(manager.offline_data(Category::Notification).await.len(), 1);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(200)).await;

    {
        let store = open_store(&dir, BackendPreference::Sqlite).await;
        let (manager, _notifier) = test_manager(store, http_remote(&server), false, SyncReporting::Batch).await;
        manager
            .enqueue(Category::UserProfile, json!({"theme": "dark"}))
            .await
            .unwrap();
    }

    let store = open_store(&dir, BackendPreference::Sqlite).await;
    let (manager, _notifier) = test_manager(store, http_remote(&server), false, SyncReporting::Batch).await;
    assert_eq!(manager.offline_status().await.pending_count, 1);

    manager.set_online(true).await;
    assert_eq!(received_paths(&server).await, vec!["/api/user/sync"]);
    assert_eq!(manager.offline_status().await.pending_count, 0);
}

#[tokio::test]
async fn test_payload_is_sent_as_json() {
    let dir = TempDir::new().unwrap();
    let server = sync_server(ResponseTemplate::new(201)).await;
    let store = open_store(&dir, BackendPreference::KeyValue).await;
    let (manager, _notifier) = test_manager(store, http_remote(&server), true, SyncReporting::Batch).await;

    let data = json!({"student": 3, "present": true, "note": "late"});
    manager.enqueue(Category::Attendance, data.clone()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, data);
}
