//! Network side of the interceptor

use crate::shared::InterceptError;
use crate::worker::cache::CachedResponse;
use crate::worker::request::InterceptedRequest;
use http::HeaderValue;
use std::future::Future;
use std::time::Duration;

/// Headers that describe one hop and are not forwarded or cached
const HOP_BY_HOP: [&str; 6] = [
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Sends intercepted requests to the network
///
/// A non-2xx answer is still `Ok`; only a request that never completed is an
/// error.
pub trait Transport: Send + Sync {
    fn fetch(
        &self,
        request: &InterceptedRequest,
    ) -> impl Future<Output = Result<CachedResponse, InterceptError>> + Send;
}

/// `reqwest` transport against an upstream origin
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: String,
}

impl ReqwestTransport {
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Result<Self, InterceptError> {
        let origin = origin.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InterceptError::network(origin.clone(), e.to_string()))?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}{}", self.origin, target)
        }
    }
}

impl Transport for ReqwestTransport {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<CachedResponse, InterceptError> {
        let url = self.url(&request.target);
        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            if is_hop_by_hop(name) {
                continue;
            }
            let value = HeaderValue::from_bytes(value)
                .map_err(|e| InterceptError::network(url.clone(), format!("header {}: {}", name, e)))?;
            builder = builder.header(name.as_str(), value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InterceptError::network(url.clone(), e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| InterceptError::network(url.clone(), e.to_string()))?;

        tracing::debug!("{} {} -> {}", request.method, url, status);
        Ok(CachedResponse::new(status, headers, body.to_vec()))
    }
}
