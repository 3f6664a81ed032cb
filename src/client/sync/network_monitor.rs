//! # Network Monitor
//!
//! Tracks online/offline transitions. Platform signals are fed in through
//! [`NetworkMonitor::transition`]; only real edges change state, update the
//! UI indicators and go out on the broadcast channel.

use crate::client::notify::{Indicators, Notifier};
use crate::client::sync::sync_state::SyncContext;
use crate::shared::ConnectivityEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Connectivity event broadcast
pub type ConnectivityBroadcast = broadcast::Sender<ConnectivityEvent>;

/// Edge-triggered connectivity monitor
pub struct NetworkMonitor {
    ctx: Arc<SyncContext>,
    events: ConnectivityBroadcast,
    notifier: Arc<dyn Notifier>,
}

impl NetworkMonitor {
    pub fn new(ctx: Arc<SyncContext>, notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { ctx, events, notifier }
    }

    /// Subscribe to connectivity edges
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Current connectivity
    pub fn is_online(&self) -> bool {
        self.ctx.is_online()
    }

    /// Apply a platform signal; returns the edge if state actually changed
    pub fn transition(&self, online: bool) -> Option<ConnectivityEvent> {
        let previous = self.ctx.swap_online(online);
        if previous == online {
            return None;
        }

        let event = if online {
            tracing::info!("Back online");
            ConnectivityEvent::Online
        } else {
            tracing::info!("Gone offline");
            ConnectivityEvent::Offline
        };

        self.notifier.indicators(Indicators::for_state(online));
        // Nobody subscribed is fine
        let _ = self.events.send(event);
        Some(event)
    }

    /// Push the current state to the UI, e.g. on startup
    pub fn refresh_indicators(&self) {
        self.notifier.indicators(Indicators::for_state(self.is_online()));
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("is_online", &self.is_online())
            .finish()
    }
}
