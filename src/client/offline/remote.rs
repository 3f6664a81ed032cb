//! Remote endpoint for outbox replay
//!
//! One `POST` per category. Any non-2xx answer or transport error is an item
//! failure.

use crate::client::config::Config;
use crate::shared::{Category, SyncError};
use std::future::Future;
use std::time::Duration;

/// Destination for replayed mutations
pub trait RemoteSink: Send + Sync {
    /// Send one serialized record to the category's write path
    fn push(
        &self,
        category: Category,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// `reqwest` client posting to the configured server
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        Self::with_base_url(config.server_url(), config.request_timeout())
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, category: Category) -> String {
        format!("{}{}", self.base_url, category.sync_path())
    }
}

impl RemoteSink for HttpRemote {
    async fn push(&self, category: Category, payload: &serde_json::Value) -> Result<(), SyncError> {
        let url = self.url(category);
        let response = self.client.post(&url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::status(status.as_u16(), url));
        }

        tracing::debug!("Pushed {} record to {}", category, url);
        Ok(())
    }
}
