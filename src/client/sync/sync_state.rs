//! # Sync State Management
//!
//! Process-wide connectivity and in-flight state, owned by one
//! [`SyncContext`] and injected by `Arc` into every component that needs it.
//!
//! `sync_in_progress` is the single-flight mutex for reconciliation: it is
//! claimed with a compare-exchange and released by [`SyncGuard`] on drop, so
//! it is cleared however the batch ends.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared connectivity and sync state
#[derive(Debug)]
pub struct SyncContext {
    is_online: AtomicBool,
    sync_in_progress: AtomicBool,
}

impl SyncContext {
    /// Create a context with the given initial connectivity
    pub fn new(is_online: bool) -> Self {
        Self {
            is_online: AtomicBool::new(is_online),
            sync_in_progress: AtomicBool::new(false),
        }
    }

    /// Current connectivity
    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::SeqCst)
    }

    /// Store connectivity, returning the previous value
    pub(crate) fn swap_online(&self, online: bool) -> bool {
        self.is_online.swap(online, Ordering::SeqCst)
    }

    /// Whether a reconciliation batch is running
    pub fn sync_in_progress(&self) -> bool {
        self.sync_in_progress.load(Ordering::SeqCst)
    }

    /// Claim the single-flight flag; `None` if a batch is already running
    pub fn try_begin_sync(&self) -> Option<SyncGuard<'_>> {
        self.sync_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncGuard { ctx: self })
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Holds the single-flight flag for the lifetime of one batch
#[derive(Debug)]
pub struct SyncGuard<'a> {
    ctx: &'a SyncContext,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.ctx.sync_in_progress.store(false, Ordering::SeqCst);
    }
}

/// User-facing status snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineStatus {
    pub is_online: bool,
    pub sync_in_progress: bool,
    /// Mutations still waiting in the outbox
    pub pending_count: usize,
}
