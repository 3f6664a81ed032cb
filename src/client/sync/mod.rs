//! # Background Sync Triggers
//!
//! Everything that decides *when* the outbox is replayed:
//!
//! - **Sync State** (`sync_state.rs`): shared connectivity and single-flight flag
//! - **Network Monitor** (`network_monitor.rs`): edge-triggered connectivity events
//! - **Scheduler** (`scheduler.rs`): periodic timers and background-sync tag
//!   registration with the worker
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::offline::{HttpRemote, OfflineManager};
//! use chatping_offline::client::sync::SyncScheduler;
//! use chatping_offline::shared::config::SyncConfig;
//! use std::sync::Arc;
//!
//! # async fn example(manager: Arc<OfflineManager<HttpRemote>>) {
//! let scheduler = SyncScheduler::start(manager, &SyncConfig::default());
//! // Timers stop when the handle is dropped
//! drop(scheduler);
//! # }
//! ```

pub mod network_monitor;
pub mod scheduler;
pub mod sync_state;

pub use network_monitor::NetworkMonitor;
pub use scheduler::SyncScheduler;
pub use sync_state::{OfflineStatus, SyncContext, SyncGuard};
