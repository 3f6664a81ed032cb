//! Chat Ping Offline - Main Library
//!
//! Offline-first data layer for the Chat Ping application. Writes made while
//! the network is down are kept in a durable outbox and replayed once
//! connectivity returns; reads are served from cache according to a
//! per-resource strategy.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by both contexts
//!   - Records, queue items and categories
//!   - Cross-context events and worker messages
//!   - Error types and configuration
//!
//! - **`client`** - The page context
//!   - Local store (SQLite, key-value fallback)
//!   - Offline manager with single-flight reconciliation
//!   - Network monitor and sync scheduler
//!   - Notifications and status indicators
//!
//! - **`worker`** - The worker context
//!   - Request interception with cache-first, network-first and
//!     offline-only strategies
//!   - Offline write queueing and background sync replay
//!   - Local proxy front end (`proxy` feature)
//!
//! # Feature Flags
//!
//! - **`proxy`** (default) - axum front end and the `chatping-proxy` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::local_db::LocalStore;
//! use chatping_offline::client::notify::TracingNotifier;
//! use chatping_offline::client::offline::{HttpRemote, OfflineManager};
//! use chatping_offline::client::sync::{SyncContext, SyncScheduler};
//! use chatping_offline::client::Config;
//! use chatping_offline::shared::Category;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let store = Arc::new(LocalStore::open(config.store()).await?);
//! let remote = HttpRemote::new(&config)?;
//! let manager = Arc::new(
//!     OfflineManager::new(
//!         Arc::new(SyncContext::default()),
//!         store,
//!         remote,
//!         Arc::new(TracingNotifier),
//!         config.sync(),
//!     )
//!     .await,
//! );
//! let _scheduler = SyncScheduler::start(manager.clone(), config.sync());
//!
//! manager
//!     .enqueue(Category::Attendance, serde_json::json!({"student": 7, "present": true}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod shared;
pub mod worker;
