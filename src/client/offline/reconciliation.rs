//! # Outbox Reconciliation
//!
//! Drains pending mutations against the remote endpoint. The replay loop is
//! written once against [`ReplaySource`] and shared by two adapters:
//!
//! - [`StoreOutbox`]: offline records and queue items in the local store
//! - `worker::background::QueuedRequestOutbox`: captured requests in the
//!   worker's offline cache partition
//!
//! ## Semantics
//!
//! - Partitions replay concurrently; units inside a partition replay
//!   sequentially, oldest first
//! - A failing unit is logged, deferred and skipped; the loop continues
//! - Failing to list a partition is a batch-level error
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::offline::reconciliation::{replay_all, StoreOutbox};
//! # use chatping_offline::client::offline::{queue::Outbox, retry::RetryPolicy, remote::HttpRemote};
//! # use chatping_offline::client::local_db::LocalStore;
//! use chatping_offline::shared::Category;
//!
//! # async fn example(store: LocalStore, remote: HttpRemote) {
//! let outbox = Outbox::new();
//! let retry = RetryPolicy::default();
//! let source = StoreOutbox::new(&store, &remote, &outbox, &retry);
//! let report = replay_all(&source, &Category::ALL).await;
//! println!("{} synced, {} failed", report.totals.succeeded, report.totals.failed);
//! # }
//! ```

use crate::client::local_db::LocalStore;
use crate::client::offline::queue::Outbox;
use crate::client::offline::remote::RemoteSink;
use crate::client::offline::retry::RetryPolicy;
use crate::shared::config::SyncReporting;
use crate::shared::{Category, OfflineRecord, SyncError, SyncQueueItem};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::fmt;
use std::future::Future;

/// A set of replayable units split into independent partitions
pub trait ReplaySource: Sync {
    /// Partition key (a category, a sync tag)
    type Partition: Copy + Send + Sync + fmt::Display;
    /// One replayable unit
    type Unit: Send + Sync + fmt::Debug;

    /// Units of a partition that should be attempted now, oldest first
    fn pending(
        &self,
        partition: Self::Partition,
    ) -> impl Future<Output = Result<Vec<Self::Unit>, SyncError>> + Send;

    /// Send a unit to the remote
    fn deliver(&self, unit: &Self::Unit) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Forget a unit after confirmed delivery
    fn retire(&self, unit: &Self::Unit) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Record a failed delivery; the unit stays pending
    fn defer(
        &self,
        unit: &Self::Unit,
        error: &SyncError,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Counters for one partition or a whole batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ReplayReport {
    fn absorb(&mut self, other: ReplayReport) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Result of one reconciliation batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Unit counters over every partition
    pub totals: ReplayReport,
    /// Batch-level errors, one per partition that could not be listed
    pub errors: Vec<String>,
}

impl BatchReport {
    /// Whether the batch counts as a success under `reporting`
    pub fn is_success(&self, reporting: SyncReporting) -> bool {
        match reporting {
            SyncReporting::Batch => self.errors.is_empty(),
            SyncReporting::PerItem => self.errors.is_empty() && self.totals.failed == 0,
        }
    }

    /// Nothing was attempted and nothing failed
    pub fn is_empty(&self) -> bool {
        self.totals.attempted == 0 && self.errors.is_empty()
    }
}

/// What `reconcile()` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Offline or another batch was running
    Skipped,
    /// A batch ran to completion
    Completed(BatchReport),
}

impl ReconcileOutcome {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            ReconcileOutcome::Skipped => None,
            ReconcileOutcome::Completed(report) => Some(report),
        }
    }
}

/// Replay one partition sequentially
pub async fn replay_partition<S: ReplaySource>(
    source: &S,
    partition: S::Partition,
) -> Result<ReplayReport, SyncError> {
    let units = source.pending(partition).await?;
    let mut report = ReplayReport::default();

    if units.is_empty() {
        return Ok(report);
    }
    tracing::debug!("Replaying {} pending units for {}", units.len(), partition);

    for unit in &units {
        report.attempted += 1;
        match source.deliver(unit).await {
            Ok(()) => match source.retire(unit).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    tracing::error!("Delivered {:?} but could not retire it: {}", unit, e);
                    report.failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to sync {} unit: {}", partition, e);
                report.failed += 1;
                if let Err(defer_err) = source.defer(unit, &e).await {
                    tracing::error!("Could not record failure for {:?}: {}", unit, defer_err);
                }
            }
        }
    }

    Ok(report)
}

/// Replay every partition concurrently and fold the results
pub async fn replay_all<S: ReplaySource>(source: &S, partitions: &[S::Partition]) -> BatchReport {
    let results = join_all(
        partitions
            .iter()
            .map(|partition| replay_partition(source, *partition)),
    )
    .await;

    let mut batch = BatchReport::default();
    for (partition, result) in partitions.iter().zip(results) {
        match result {
            Ok(report) => batch.totals.absorb(report),
            Err(e) => {
                tracing::error!("Error syncing {}: {}", partition, e);
                batch.errors.push(format!("{}: {}", partition, e));
            }
        }
    }
    batch
}

/// A pending unit of the page outbox
#[derive(Debug, Clone, PartialEq)]
pub enum PendingUnit {
    /// Unsynced offline record
    Record(OfflineRecord),
    /// Queued mutation that is due under the retry policy
    Queued(SyncQueueItem),
}

impl PendingUnit {
    pub fn category(&self) -> Category {
        match self {
            PendingUnit::Record(record) => record.category,
            PendingUnit::Queued(item) => item.category,
        }
    }

    pub fn payload(&self) -> &serde_json::Value {
        match self {
            PendingUnit::Record(record) => &record.payload,
            PendingUnit::Queued(item) => &item.data,
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PendingUnit::Record(record) => record.created_at,
            PendingUnit::Queued(item) => item.enqueued_at,
        }
    }
}

/// Page-side replay source over the local store
pub struct StoreOutbox<'a, R> {
    store: &'a LocalStore,
    remote: &'a R,
    outbox: &'a Outbox,
    retry: &'a RetryPolicy,
}

impl<'a, R: RemoteSink> StoreOutbox<'a, R> {
    pub fn new(store: &'a LocalStore, remote: &'a R, outbox: &'a Outbox, retry: &'a RetryPolicy) -> Self {
        Self {
            store,
            remote,
            outbox,
            retry,
        }
    }
}

impl<R: RemoteSink> ReplaySource for StoreOutbox<'_, R> {
    type Partition = Category;
    type Unit = PendingUnit;

    async fn pending(&self, category: Category) -> Result<Vec<PendingUnit>, SyncError> {
        let now = Utc::now();
        let records = self.store.records(category).await?;
        let queued = self.store.queue_items().await?;

        let mut units: Vec<PendingUnit> = records
            .into_iter()
            .filter(|record| !record.synced)
            .map(PendingUnit::Record)
            .chain(
                queued
                    .into_iter()
                    .filter(|item| item.category == category && self.retry.is_due(item, now))
                    .map(PendingUnit::Queued),
            )
            .collect();
        units.sort_by_key(PendingUnit::timestamp);
        Ok(units)
    }

    async fn deliver(&self, unit: &PendingUnit) -> Result<(), SyncError> {
        self.remote.push(unit.category(), unit.payload()).await
    }

    async fn retire(&self, unit: &PendingUnit) -> Result<(), SyncError> {
        match unit {
            PendingUnit::Record(record) => {
                if let Err(e) = self.store.delete_record(record.category, record.id).await {
                    tracing::warn!("Could not delete synced record #{}: {}", record.id, e);
                    self.store.mark_record_synced(record).await?;
                }
            }
            PendingUnit::Queued(item) => {
                self.store.delete_queue_item(item.id).await?;
                self.outbox.remove(item.id).await;
            }
        }
        tracing::debug!("Synced {} unit", unit.category());
        Ok(())
    }

    async fn defer(&self, unit: &PendingUnit, error: &SyncError) -> Result<(), SyncError> {
        if let PendingUnit::Queued(item) = unit {
            let mut item = item.clone();
            item.record_failure(error.to_string());
            self.store.update_queue_item(&item).await?;
            self.outbox.update(&item).await;
        }
        Ok(())
    }
}
