//! Shared Error Types
//!
//! This module defines the error types used across the page context
//! (store, outbox, reconciliation) and the worker context (interception).
//!
//! # Error Categories
//!
//! - `StoreError` - local persistent store failures
//! - `SyncError` - remote write failures during replay
//! - `InterceptError` - network failures the interceptor could not recover from
//! - `ConfigError` - configuration loading and validation failures
//!
//! # Usage
//!
//! ```rust
//! use chatping_offline::shared::error::SyncError;
//!
//! let error = SyncError::status(503, "/api/attendance/sync");
//! assert!(error.to_string().contains("503"));
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be moved between tasks.
use thiserror::Error;

/// Local persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be opened
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Human-readable error message
        message: String,
    },

    /// SQLite backend error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Key-value backend file error
    #[error("Key-value store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a new store-unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Errors raised while replaying outbox items against the remote endpoint
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote answered with a non-success status
    #[error("Remote rejected write to {target} with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Target path or URL
        target: String,
    },

    /// Request never reached the remote
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
    },

    /// Local store failed while reading or retiring an item
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payload could not be serialized for sending
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a new status error
    pub fn status(status: u16, target: impl Into<String>) -> Self {
        Self::Status {
            status,
            target: target.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::status(
                status.as_u16(),
                err.url().map(|u| u.to_string()).unwrap_or_default(),
            ),
            None => Self::transport(err.to_string()),
        }
    }
}

/// Errors surfaced by the request interceptor
#[derive(Debug, Error)]
pub enum InterceptError {
    /// Network failed and no fallback applied
    #[error("Network error for {target}: {message}")]
    Network {
        /// Request target
        target: String,
        /// Human-readable error message
        message: String,
    },
}

impl InterceptError {
    /// Create a new network error
    pub fn network(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
