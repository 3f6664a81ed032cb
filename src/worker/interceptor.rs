//! # Request Interceptor
//!
//! Answers every outgoing request from cache, network or a synthesized
//! response, depending on the request method and the strategy of its
//! resource class.
//!
//! ## Strategies
//!
//! - **cache-first**: cached copy, else network (2xx responses are cached),
//!   else `503 Offline - Content not available`
//! - **network-first**: network (2xx refreshes the cache), else cached copy,
//!   else the offline page for documents, else the network error
//! - **offline-only**: cached copy, else `503 Offline only content`
//!
//! Writes (anything but GET/HEAD) skip strategies: they go to the network
//! and, if that fails, are queued in the offline partition and acknowledged
//! with `202 Accepted`.

use crate::client::notify::{Notifier, Severity, WRITE_QUEUED_MESSAGE};
use crate::shared::config::{Strategy, WorkerConfig};
use crate::shared::InterceptError;
use crate::worker::cache::{content_type, CacheStorage, CachedResponse, OfflineEntryKind};
use crate::worker::request::{Destination, InterceptedRequest, QueuedRequest};
use crate::worker::strategy::StrategyTable;
use crate::worker::transport::Transport;
use http::Method;
use std::sync::Arc;

/// Body of the cache-first miss response
pub const CACHE_MISS_BODY: &str = "Offline - Content not available";

/// Body of the offline-only miss response
pub const OFFLINE_ONLY_BODY: &str = "Offline only content";

/// Cache key of a custom offline page
pub const OFFLINE_PAGE_KEY: &str = "/offline.html";

/// Built-in offline page
pub const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Offline - Chat Ping</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body { font-family: Arial, sans-serif; text-align: center; padding: 50px; }
    .offline-icon { font-size: 64px; margin-bottom: 20px; }
    .retry-btn { background: #FF6B6B; color: white; border: none; padding: 12px 24px; border-radius: 8px; cursor: pointer; }
  </style>
</head>
<body>
  <div class="offline-icon">&#128241;</div>
  <h1>You're Offline</h1>
  <p>Some features are still available offline. Your data will sync when you're back online.</p>
  <button class="retry-btn" onclick="window.location.reload()">Retry</button>
</body>
</html>
"#;

/// Acknowledgement for a write queued while offline
pub fn queued_ack() -> CachedResponse {
    CachedResponse::json(
        202,
        &serde_json::json!({
            "success": true,
            "offline": true,
            "message": WRITE_QUEUED_MESSAGE,
        }),
    )
}

/// Strategy-driven request handler
pub struct Interceptor<T> {
    transport: Arc<T>,
    caches: Arc<CacheStorage>,
    static_cache: String,
    offline_cache: String,
    strategies: StrategyTable,
    notifier: Arc<dyn Notifier>,
}

impl<T: Transport> Interceptor<T> {
    pub fn new(
        transport: Arc<T>,
        caches: Arc<CacheStorage>,
        config: &WorkerConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            caches,
            static_cache: config.static_cache.clone(),
            offline_cache: config.offline_cache.clone(),
            strategies: StrategyTable::from_config(config),
            notifier,
        }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Answer one request
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
        if !request.is_read() {
            return self.handle_write(request).await;
        }

        let mut response = match self.strategies.select(request.path()) {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await?,
            Strategy::OfflineOnly => self.offline_only(request).await,
        };
        // A cached GET may answer a HEAD; only its status and headers apply
        if request.method == Method::HEAD {
            response.body.clear();
        }
        Ok(response)
    }

    async fn cache_first(&self, request: &InterceptedRequest) -> CachedResponse {
        if let Some(cached) = self.caches.match_any(request.cache_key()).await {
            tracing::debug!("Cache hit for {}", request.target);
            return cached;
        }

        match self.transport.fetch(request).await {
            Ok(response) => {
                self.store_copy(request, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!("Cache-first miss while offline: {}", e);
                CachedResponse::text(503, CACHE_MISS_BODY)
            }
        }
    }

    async fn network_first(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
        let error = match self.transport.fetch(request).await {
            Ok(response) => {
                self.store_copy(request, &response).await;
                return Ok(response);
            }
            Err(e) => e,
        };

        if let Some(cached) = self.caches.match_any(request.cache_key()).await {
            tracing::debug!("Network failed, serving cached {}", request.target);
            return Ok(cached);
        }

        if request.destination == Destination::Document {
            tracing::debug!("Network failed, serving offline page for {}", request.target);
            return Ok(self.offline_page().await);
        }

        Err(error)
    }

    async fn offline_only(&self, request: &InterceptedRequest) -> CachedResponse {
        match self.caches.match_any(request.cache_key()).await {
            Some(cached) => cached,
            None => CachedResponse::text(503, OFFLINE_ONLY_BODY),
        }
    }

    async fn handle_write(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
        let error = match self.transport.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        tracing::warn!("{} {} failed, queueing for sync: {}", request.method, request.target, error);
        let queued = QueuedRequest::capture(request);
        let body = match serde_json::to_vec(&queued) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Could not serialize queued request: {}", e);
                return Err(error);
            }
        };

        let offline = self.caches.open(&self.offline_cache).await;
        let stored = offline
            .put_generated(
                OfflineEntryKind::Request,
                CachedResponse::new(200, content_type("application/json"), body),
            )
            .await;
        match stored {
            Ok(key) => tracing::debug!("Stored {}", key),
            Err(e) => {
                tracing::error!("Could not queue {} {}: {}", request.method, request.target, e);
                return Err(error);
            }
        }

        self.notifier.notify(WRITE_QUEUED_MESSAGE, Severity::Info);
        Ok(queued_ack())
    }

    /// Cache a successful GET response in the static partition
    async fn store_copy(&self, request: &InterceptedRequest, response: &CachedResponse) {
        if request.method != Method::GET || !response.is_success() {
            return;
        }
        let stored = self
            .caches
            .open(&self.static_cache)
            .await
            .put(request.cache_key(), response.clone())
            .await;
        if let Err(e) = stored {
            tracing::warn!("Could not cache {}: {}", request.target, e);
        }
    }

    async fn offline_page(&self) -> CachedResponse {
        match self.caches.match_any(OFFLINE_PAGE_KEY).await {
            Some(page) => page,
            None => CachedResponse::html(200, OFFLINE_PAGE),
        }
    }
}
