//! # Local Database Module
//!
//! Durable key/record storage for offline-first operation with two
//! interchangeable backends:
//!
//! - **SQLite** (`sqlite.rs`): transactional structured store through `sqlx`
//! - **Key-value** (`key_value.rs`): flat JSON namespace on disk, used when
//!   SQLite cannot be opened
//!
//! Callers only ever see [`LocalStore`]; the outbox and the reconciliation
//! engine never special-case a backend.
//!
//! ## Failure policy
//!
//! Writes propagate a [`StoreError`]. [`LocalStore::get_all`] logs failures and
//! returns an empty list; [`LocalStore::try_get_all`] is the strict variant.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatping_offline::client::local_db::{Collection, LocalStore};
//! use chatping_offline::shared::config::StoreConfig;
//! use chatping_offline::shared::Category;
//!
//! # async fn example() -> Result<(), chatping_offline::shared::StoreError> {
//! let store = LocalStore::open(&StoreConfig::default()).await?;
//! let collection = Collection::Records(Category::Attendance);
//! let id = store.put(collection, &serde_json::json!({"present": true})).await?;
//! store.remove(collection, id).await?;
//! # Ok(())
//! # }
//! ```

pub mod key_value;
pub mod schema;
pub mod sqlite;
pub mod sync;

pub use key_value::KeyValueStore;
pub use sqlite::SqliteStore;

use crate::shared::config::{BackendPreference, StoreConfig};
use crate::shared::{Category, RecordId, StoreError};

/// Result type for local store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite file name inside the data directory
pub const SQLITE_FILE: &str = "offline.db";

/// Key-value file name inside the data directory
pub const KEY_VALUE_FILE: &str = "offline_kv.json";

/// A named group of stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Offline records of one category
    Records(Category),
    /// Queued mutations of every category
    SyncQueue,
}

impl Collection {
    /// Stable collection name used by both backends
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Records(category) => category.collection_name(),
            Collection::SyncQueue => "sync_queue",
        }
    }
}

/// Backend actually in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    KeyValue,
}

/// A stored value with its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RecordId,
    pub value: serde_json::Value,
}

#[derive(Debug)]
enum Backend {
    Sqlite(SqliteStore),
    KeyValue(KeyValueStore),
}

/// Local persistent store
#[derive(Debug)]
pub struct LocalStore {
    backend: Backend,
}

impl LocalStore {
    /// Open the store according to `config`
    ///
    /// With [`BackendPreference::Auto`] a SQLite open failure is logged and
    /// the key-value backend is opened instead.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let dir = config.dir();
        tokio::fs::create_dir_all(&dir).await?;

        match config.backend {
            BackendPreference::Sqlite => {
                let store = SqliteStore::open(&dir.join(SQLITE_FILE)).await?;
                Ok(Self::from_sqlite(store))
            }
            BackendPreference::KeyValue => {
                let store = KeyValueStore::open(dir.join(KEY_VALUE_FILE)).await?;
                Ok(Self::from_key_value(store))
            }
            BackendPreference::Auto => match SqliteStore::open(&dir.join(SQLITE_FILE)).await {
                Ok(store) => {
                    tracing::info!("Local store opened with SQLite backend");
                    Ok(Self::from_sqlite(store))
                }
                Err(e) => {
                    tracing::warn!("SQLite unavailable ({}), falling back to key-value store", e);
                    let store = KeyValueStore::open(dir.join(KEY_VALUE_FILE)).await?;
                    Ok(Self::from_key_value(store))
                }
            },
        }
    }

    /// Wrap an opened SQLite store
    pub fn from_sqlite(store: SqliteStore) -> Self {
        Self {
            backend: Backend::Sqlite(store),
        }
    }

    /// Wrap an opened key-value store
    pub fn from_key_value(store: KeyValueStore) -> Self {
        Self {
            backend: Backend::KeyValue(store),
        }
    }

    /// Which backend is serving requests
    pub fn backend_kind(&self) -> BackendKind {
        match &self.backend {
            Backend::Sqlite(_) => BackendKind::Sqlite,
            Backend::KeyValue(_) => BackendKind::KeyValue,
        }
    }

    /// Persist a value, returning its new id
    pub async fn put(&self, collection: Collection, value: &serde_json::Value) -> Result<RecordId> {
        let result = match &self.backend {
            Backend::Sqlite(store) => store.put(collection.name(), value).await,
            Backend::KeyValue(store) => store.put(collection.name(), value).await,
        };
        if let Err(e) = &result {
            tracing::error!("Failed to store value in {}: {}", collection.name(), e);
        }
        result
    }

    /// Overwrite the value stored under `id`
    pub async fn replace(&self, collection: Collection, id: RecordId, value: &serde_json::Value) -> Result<()> {
        let result = match &self.backend {
            Backend::Sqlite(store) => store.replace(collection.name(), id, value).await,
            Backend::KeyValue(store) => store.replace(collection.name(), id, value).await,
        };
        if let Err(e) = &result {
            tracing::error!("Failed to update {} #{}: {}", collection.name(), id, e);
        }
        result
    }

    /// Read every value in a collection, oldest first
    pub async fn try_get_all(&self, collection: Collection) -> Result<Vec<StoredRow>> {
        match &self.backend {
            Backend::Sqlite(store) => store.get_all(collection.name()).await,
            Backend::KeyValue(store) => store.get_all(collection.name()).await,
        }
    }

    /// Read every value in a collection; failures yield an empty list
    pub async fn get_all(&self, collection: Collection) -> Vec<StoredRow> {
        match self.try_get_all(collection).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", collection.name(), e);
                Vec::new()
            }
        }
    }

    /// Delete the value stored under `id`; deleting a missing id is not an error
    pub async fn remove(&self, collection: Collection, id: RecordId) -> Result<()> {
        let result = match &self.backend {
            Backend::Sqlite(store) => store.remove(collection.name(), id).await,
            Backend::KeyValue(store) => store.remove(collection.name(), id).await,
        };
        if let Err(e) = &result {
            tracing::error!("Failed to delete {} #{}: {}", collection.name(), id, e);
        }
        result
    }

    /// Number of values in a collection
    pub async fn count(&self, collection: Collection) -> Result<usize> {
        match &self.backend {
            Backend::Sqlite(store) => store.count(collection.name()).await,
            Backend::KeyValue(store) => store.count(collection.name()).await,
        }
    }
}
