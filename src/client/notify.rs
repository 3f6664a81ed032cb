/**
 * Status / Notification Bridge
 *
 * Surfaces connectivity changes and sync outcomes to whatever renders the
 * user interface. Components only talk to the `Notifier` trait; the UI picks
 * an implementation:
 *
 * - `TracingNotifier` logs every notification
 * - `ChannelNotifier` broadcasts `StatusEvent`s to any number of subscribers
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Shown after a batch completes without a batch-level failure
pub const SYNC_SUCCESS_MESSAGE: &str = "Data synced successfully!";

/// Shown after a batch fails
pub const SYNC_FAILURE_MESSAGE: &str = "Sync failed. Will retry when online.";

/// Shown when a manual sync is requested while offline
pub const OFFLINE_NOTICE_MESSAGE: &str = "You are offline. Data will sync when online.";

/// Shown when the worker queues a write for later replay
pub const WRITE_QUEUED_MESSAGE: &str = "Request queued for sync when online";

/// Notification severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A user-visible notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Connectivity indicator state for the UI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Indicators {
    /// Connection status badge
    pub online: bool,
    /// Offline banners visible
    pub show_offline_banner: bool,
    /// Manual-sync controls visible
    pub show_sync_controls: bool,
}

impl Indicators {
    /// Indicator state for a connectivity value
    pub fn for_state(online: bool) -> Self {
        Self {
            online,
            show_offline_banner: !online,
            show_sync_controls: !online,
        }
    }
}

/// Receives status updates for presentation
pub trait Notifier: Send + Sync {
    /// Show a message to the user
    fn notify(&self, message: &str, severity: Severity);

    /// Update connectivity indicators
    fn indicators(&self, _indicators: Indicators) {}
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(target: "chatping::notify", "{}", message),
            Severity::Info | Severity::Success => {
                tracing::info!(target: "chatping::notify", "{}", message)
            }
        }
    }

    fn indicators(&self, indicators: Indicators) {
        tracing::debug!(target: "chatping::notify", ?indicators, "Indicators updated");
    }
}

/// Event published by [`ChannelNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Notification(Notification),
    Indicators(Indicators),
}

/// Notifier that broadcasts to UI subscribers
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<StatusEvent>,
}

impl ChannelNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to status events
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: StatusEvent) {
        // No subscribers is fine; nothing is rendering right now
        let _ = self.tx.send(event);
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.publish(StatusEvent::Notification(Notification {
            message: message.to_string(),
            severity,
            timestamp: Utc::now(),
        }));
    }

    fn indicators(&self, indicators: Indicators) {
        self.publish(StatusEvent::Indicators(indicators));
    }
}
