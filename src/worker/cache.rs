//! # Cache Storage
//!
//! Named cache partitions holding `(request key -> response)` pairs. Entries
//! never expire; a whole partition is dropped when the worker activates a new
//! version. Partitions live in memory unless a backing file is attached, in
//! which case every change is written to that file (temp file and rename)
//! before it becomes visible. A write that cannot be persisted is rolled back.
//!
//! The offline partition also stores worker-side data under generated keys:
//!
//! | Kind | Key |
//! |------|-----|
//! | queued request | `offline-request-<millis>` |
//! | push notification | `notification-<millis>` |
//! | cached data | `data-<millis>` |

use crate::shared::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

type Entries = Vec<(String, CachedResponse)>;

/// A stored (or synthesized) HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    /// Header pairs in received order; values are raw bytes
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, Vec<u8>)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Plain-text response
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(
            status,
            content_type("text/plain; charset=utf-8"),
            body,
        )
    }

    /// HTML response
    pub fn html(status: u16, body: &str) -> Self {
        Self::new(
            status,
            content_type("text/html; charset=utf-8"),
            body,
        )
    }

    /// JSON response
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(
            status,
            content_type("application/json"),
            value.to_string(),
        )
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with this name, case-insensitive
    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_slice())
    }

    /// First header value with this name, if it is valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_bytes(name).and_then(|value| std::str::from_utf8(value).ok())
    }
}

pub(crate) fn content_type(value: &str) -> Vec<(String, Vec<u8>)> {
    vec![("content-type".to_string(), value.as_bytes().to_vec())]
}

/// Kinds of worker-generated entries in the offline partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineEntryKind {
    Request,
    Notification,
    Data,
}

impl OfflineEntryKind {
    pub fn prefix(self) -> &'static str {
        match self {
            OfflineEntryKind::Request => "offline-request-",
            OfflineEntryKind::Notification => "notification-",
            OfflineEntryKind::Data => "data-",
        }
    }

    /// Kind of a stored key, if it is a generated one
    pub fn of_key(key: &str) -> Option<Self> {
        [
            OfflineEntryKind::Request,
            OfflineEntryKind::Notification,
            OfflineEntryKind::Data,
        ]
        .into_iter()
        .find(|kind| {
            key.strip_prefix(kind.prefix())
                .is_some_and(|suffix| suffix.parse::<i64>().is_ok())
        })
    }
}

/// One named partition; entries keep insertion order
#[derive(Debug)]
pub struct CachePartition {
    name: String,
    entries: RwLock<Entries>,
    file: OnceLock<PathBuf>,
}

impl CachePartition {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: RwLock::new(Vec::new()),
            file: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Back the partition with `path`
    ///
    /// Entries already in the file come first, followed by entries added in
    /// memory before the attach (same key: memory wins). Returns the number
    /// of entries loaded from the file.
    async fn attach(&self, path: PathBuf) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        if self.file.get().is_some() {
            return Ok(0);
        }

        let mut merged: Entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let loaded = merged.len();
        for (key, response) in entries.iter() {
            upsert(&mut merged, key.clone(), response.clone());
        }

        write_entries(&path, &merged).await?;
        let _ = self.file.set(path);
        *entries = merged;
        Ok(loaded)
    }

    /// Apply `change`, persisting first when the partition is durable
    async fn update<R>(&self, change: impl FnOnce(&mut Entries) -> R) -> Result<R, StoreError> {
        let mut entries = self.entries.write().await;
        let Some(path) = self.file.get() else {
            return Ok(change(&mut *entries));
        };

        let mut next = entries.clone();
        let result = change(&mut next);
        write_entries(path, &next).await?;
        *entries = next;
        Ok(result)
    }

    /// Store a response, overwriting any entry with the same key
    pub async fn put(&self, key: impl Into<String>, response: CachedResponse) -> Result<(), StoreError> {
        let key = key.into();
        self.update(|entries| upsert(entries, key, response)).await
    }

    /// Store under a fresh generated key and return it
    pub async fn put_generated(
        &self,
        kind: OfflineEntryKind,
        response: CachedResponse,
    ) -> Result<String, StoreError> {
        self.update(|entries| {
            let mut stamp = chrono::Utc::now().timestamp_millis();
            let key = loop {
                let candidate = format!("{}{}", kind.prefix(), stamp);
                if !entries.iter().any(|(existing, _)| *existing == candidate) {
                    break candidate;
                }
                stamp += 1;
            };
            entries.push((key.clone(), response));
            key
        })
        .await
    }

    /// Look up a response by key
    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        self.entries
            .read()
            .await
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, response)| response.clone())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        if !self.entries.read().await.iter().any(|(existing, _)| existing == key) {
            return Ok(false);
        }
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|(existing, _)| existing != key);
            entries.len() != before
        })
        .await
    }

    /// All keys, oldest first
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Generated entries of one kind, oldest first
    pub async fn entries_of(&self, kind: OfflineEntryKind) -> Vec<(String, CachedResponse)> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(key, _)| OfflineEntryKind::of_key(key) == Some(kind))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn upsert(entries: &mut Entries, key: String, response: CachedResponse) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some((_, slot)) => *slot = response,
        None => entries.push((key, response)),
    }
}

async fn write_entries(path: &Path, entries: &Entries) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(entries)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// The set of named partitions
#[derive(Debug, Default)]
pub struct CacheStorage {
    partitions: RwLock<BTreeMap<String, Arc<CachePartition>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a partition, creating it if missing
    pub async fn open(&self, name: &str) -> Arc<CachePartition> {
        if let Some(partition) = self.partitions.read().await.get(name) {
            return partition.clone();
        }
        self.partitions
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CachePartition::new(name.to_string())))
            .clone()
    }

    /// Open a partition and back it with `path`, loading what the file holds
    pub async fn open_durable(
        &self,
        name: &str,
        path: PathBuf,
    ) -> Result<Arc<CachePartition>, StoreError> {
        let partition = self.open(name).await;
        let loaded = partition.attach(path).await?;
        tracing::debug!("Partition {} loaded {} entries from disk", name, loaded);
        Ok(partition)
    }

    /// Existing partition only
    pub async fn get(&self, name: &str) -> Option<Arc<CachePartition>> {
        self.partitions.read().await.get(name).cloned()
    }

    pub async fn delete(&self, name: &str) -> bool {
        self.partitions.write().await.remove(name).is_some()
    }

    pub async fn names(&self) -> Vec<String> {
        self.partitions.read().await.keys().cloned().collect()
    }

    /// First match for `key` in any partition
    pub async fn match_any(&self, key: &str) -> Option<CachedResponse> {
        let partitions: Vec<_> = self.partitions.read().await.values().cloned().collect();
        for partition in partitions {
            if let Some(response) = partition.get(key).await {
                return Some(response);
            }
        }
        None
    }
}
