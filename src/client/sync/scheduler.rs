//! # Sync Scheduler
//!
//! Two independent periodic triggers for reconciliation:
//!
//! - **Fast tick**: reconcile when online and idle
//! - **Pending check**: reconcile when the persisted queue is non-empty
//!
//! Both run as tokio tasks for as long as the [`SyncScheduler`] lives. Each
//! tick goes through `reconcile()`, so overlapping triggers never start a
//! second batch.

use crate::client::offline::{OfflineManager, RemoteSink};
use crate::shared::config::SyncConfig;
use crate::shared::{SyncTag, WorkerMessage};
use crate::worker::WorkerHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Running periodic sync tasks; aborted on drop
#[derive(Debug)]
pub struct SyncScheduler {
    fast: JoinHandle<()>,
    pending: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawn both timers
    pub fn start<R>(manager: Arc<OfflineManager<R>>, config: &SyncConfig) -> Self
    where
        R: RemoteSink + 'static,
    {
        let fast_period = Duration::from_secs(config.fast_interval_secs);
        let pending_period = Duration::from_secs(config.pending_check_interval_secs);

        let fast = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + fast_period, fast_period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if manager.is_online() && !manager.sync_in_progress() {
                        manager.reconcile().await;
                    }
                }
            })
        };

        let pending = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + pending_period, pending_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.check_pending_syncs().await;
            }
        });

        tracing::info!(
            "Sync scheduler started (fast: {:?}, pending check: {:?})",
            fast_period,
            pending_period
        );
        Self { fast, pending }
    }

    /// Register every background-sync tag with the worker
    ///
    /// Returns how many registrations were delivered.
    pub async fn register_background_sync(&self, worker: &WorkerHandle) -> usize {
        let mut registered = 0;
        for tag in SyncTag::ALL {
            match worker.send(WorkerMessage::RegisterSync(tag)).await {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!("Background sync registration for {} failed: {}", tag, e),
            }
        }
        registered
    }

    /// Stop both timers
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.fast.abort();
        self.pending.abort();
    }
}
