//! Shared Module
//!
//! This module contains types shared between the page context (offline
//! manager, store, scheduler) and the worker context (request interception,
//! background sync).
//!
//! # Overview
//!
//! The shared module provides the data model, cross-context events, error
//! types and configuration. None of these types hold runtime state.

/// Offline records, queue items and categories
pub mod record;

/// Cross-context events and worker messages
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use record::{Category, OfflineRecord, RecordId, SyncQueueItem};
pub use event::{ConnectivityEvent, SyncTag, WorkerMessage};
pub use error::{ConfigError, InterceptError, StoreError, SyncError};
pub use config::{AppConfig, AppConfigBuilder, Strategy, SyncReporting};
