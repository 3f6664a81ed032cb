//! # Key-Value Backend
//!
//! Flat key-value namespace persisted as a single JSON file. Keys are
//! synthesized as `<collection>_<timestamp-millis>`; the numeric suffix is the
//! record id. Used when the SQLite backend is unavailable.

use crate::client::local_db::{Result, StoredRow};
use crate::shared::{RecordId, StoreError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// File-backed flat key-value store
#[derive(Debug)]
pub struct KeyValueStore {
    path: PathBuf,
    /// Key -> serialized value
    entries: RwLock<BTreeMap<String, String>>,
}

impl KeyValueStore {
    /// Open the namespace, loading existing entries if the file exists
    pub async fn open(path: PathBuf) -> Result<Self> {
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Key-value store loaded {} entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn key(collection: &str, id: RecordId) -> String {
        format!("{}_{}", collection, id)
    }

    fn ids_in<'a>(
        entries: &'a BTreeMap<String, String>,
        collection: &'a str,
    ) -> impl Iterator<Item = (RecordId, &'a String)> + 'a {
        let prefix = format!("{}_", collection);
        entries.iter().filter_map(move |(key, value)| {
            let suffix = key.strip_prefix(&prefix)?;
            suffix.parse::<RecordId>().ok().map(|id| (id, value))
        })
    }

    /// Write the whole namespace to disk via a temp file and rename
    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Flush `next` and make it the live namespace; on failure nothing changes
    async fn commit(
        &self,
        entries: &mut BTreeMap<String, String>,
        next: BTreeMap<String, String>,
    ) -> Result<()> {
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    pub async fn put(&self, collection: &str, value: &serde_json::Value) -> Result<RecordId> {
        let serialized = serde_json::to_string(value)?;
        let mut entries = self.entries.write().await;

        // Timestamp ids stay ordered even when the clock repeats a millisecond
        let now = chrono::Utc::now().timestamp_millis();
        let last = Self::ids_in(&entries, collection).map(|(id, _)| id).max();
        let id = match last {
            Some(last) if last >= now => last + 1,
            _ => now,
        };

        let mut next = entries.clone();
        next.insert(Self::key(collection, id), serialized);
        self.commit(&mut entries, next).await?;
        Ok(id)
    }

    pub async fn replace(&self, collection: &str, id: RecordId, value: &serde_json::Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        match next.get_mut(&Self::key(collection, id)) {
            Some(slot) => *slot = serialized,
            None => {
                return Err(StoreError::unavailable(format!("{} #{} not found", collection, id)));
            }
        }
        self.commit(&mut entries, next).await
    }

    pub async fn get_all(&self, collection: &str) -> Result<Vec<StoredRow>> {
        let entries = self.entries.read().await;
        let mut rows = Vec::new();
        for (id, raw) in Self::ids_in(&entries, collection) {
            match serde_json::from_str(raw) {
                Ok(value) => rows.push(StoredRow { id, value }),
                Err(e) => tracing::warn!("Skipping malformed {} #{}: {}", collection, id, e),
            }
        }
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    pub async fn remove(&self, collection: &str, id: RecordId) -> Result<()> {
        let mut entries = self.entries.write().await;
        let key = Self::key(collection, id);
        if !entries.contains_key(&key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(&key);
        self.commit(&mut entries, next).await
    }

    pub async fn count(&self, collection: &str) -> Result<usize> {
        let entries = self.entries.read().await;
        Ok(Self::ids_in(&entries, collection).count())
    }
}
