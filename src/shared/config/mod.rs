//! Application configuration module
//!
//! Provides the configuration types shared by the page context and the
//! worker. Values come from an optional TOML file; every field has a default
//! so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use crate::shared::error::ConfigError;

/// Default remote endpoint
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Versioned partition for static/application assets
pub const DEFAULT_STATIC_CACHE: &str = "chat-ping-v2.0.0";

/// Partition for offline-queued writes and notifications
pub const DEFAULT_OFFLINE_CACHE: &str = "chat-ping-offline-v1";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Local persistent store settings
    pub store: StoreConfig,
    /// Outbox and reconciliation settings
    pub sync: SyncConfig,
    /// Worker (interception) settings
    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.sync.fast_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.fast_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.sync.pending_check_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.pending_check_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.sync.retry.jitter) {
            return Err(ConfigError::InvalidValue {
                field: "sync.retry.jitter",
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.worker.replay_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.replay_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.worker.static_cache == self.worker.offline_cache {
            return Err(ConfigError::InvalidValue {
                field: "worker.offline_cache",
                message: "must differ from worker.static_cache".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: String) -> Self {
        self.config.server_url = Some(url);
        self
    }

    /// Set the store settings
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Set the sync settings
    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.config.sync = sync;
        self
    }

    /// Set the worker settings
    pub fn worker(mut self, worker: WorkerConfig) -> Self {
        self.config.worker = worker;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Which store backend to open
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// SQLite, falling back to key-value when it cannot be opened
    #[default]
    Auto,
    /// SQLite only
    Sqlite,
    /// Flat key-value file only
    KeyValue,
}

/// Local persistent store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: BackendPreference,
    /// Directory holding the store files; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// `data_dir`, else `<platform data dir>/chatping`
    pub fn dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
            path.push("chatping");
            path
        })
    }
}

/// How a finished batch is reported to the user
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncReporting {
    /// Failure only when the batch itself errored; item failures are silent
    #[default]
    Batch,
    /// Failure when any item failed
    PerItem,
}

/// Retry backoff settings for queued mutations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Base interval in seconds
    pub base_interval_secs: u64,
    /// Maximum interval in seconds
    pub max_interval_secs: u64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 1,
            max_interval_secs: 300,
            jitter: 0.1,
        }
    }
}

/// Outbox and reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Fast reconcile tick, in seconds
    pub fast_interval_secs: u64,
    /// Pending-queue check tick, in seconds
    pub pending_check_interval_secs: u64,
    /// HTTP timeout for remote writes, in seconds
    pub request_timeout_secs: u64,
    /// Batch vs per-item reporting
    pub reporting: SyncReporting,
    /// Backoff for failed queue items
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: 30,
            pending_check_interval_secs: 300,
            request_timeout_secs: 30,
            reporting: SyncReporting::Batch,
            retry: RetryConfig::default(),
        }
    }
}

/// Caching strategy applied to a resource class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache, fall back to network
    CacheFirst,
    /// Try network, fall back to cache
    NetworkFirst,
    /// Serve from cache only
    OfflineOnly,
}

/// Worker (interception) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Versioned static asset partition
    pub static_cache: String,
    /// Offline queue partition
    pub offline_cache: String,
    /// Assets fetched into the static partition on install
    pub precache: Vec<String>,
    /// Strategy per resource class (`static`, `api`, `pages`)
    pub strategies: BTreeMap<String, Strategy>,
    /// Port for the local proxy
    pub proxy_port: u16,
    /// Period of the queued request retry, in seconds
    pub replay_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            static_cache: DEFAULT_STATIC_CACHE.to_string(),
            offline_cache: DEFAULT_OFFLINE_CACHE.to_string(),
            precache: vec![
                "/".to_string(),
                "/manifest.json".to_string(),
                "/sw.js".to_string(),
                "/static/css/main.css".to_string(),
                "/static/js/main.js".to_string(),
            ],
            strategies: BTreeMap::new(),
            proxy_port: 8080,
            replay_interval_secs: 30,
        }
    }
}
