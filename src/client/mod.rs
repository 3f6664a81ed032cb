//! # Client Module
//!
//! The page context: everything that runs alongside the application rather
//! than inside the worker.
//!
//! - `config.rs`: layered configuration (defaults, TOML file, environment)
//! - `local_db/`: durable store with SQLite and key-value backends
//! - `offline/`: outbox, retry policy and single-flight reconciliation
//! - `sync/`: connectivity state, network monitor and the periodic scheduler
//! - `notify.rs`: user-facing notifications and status indicators

pub mod config;
pub mod local_db;
pub mod notify;
pub mod offline;
pub mod sync;

pub use config::Config;
pub use offline::OfflineManager;
