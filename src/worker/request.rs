//! Intercepted requests and their queued form

use crate::shared::Category;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::Method;
use serde::{Deserialize, Serialize};

/// What the request will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// Top-level navigation
    Document,
    #[default]
    Other,
}

/// An outgoing request seen by the interceptor
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptedRequest {
    pub method: Method,
    /// Path and query, e.g. `/api/attendance?day=1`
    pub target: String,
    /// Header pairs in received order, duplicates kept; values are raw bytes
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
    pub destination: Destination,
}

impl InterceptedRequest {
    /// Body-less GET
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            destination: Destination::Other,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((name.into(), value.as_ref().to_vec()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// GET and HEAD go through caching strategies; everything else is a write
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Path without query or fragment
    pub fn path(&self) -> &str {
        self.target.split(['?', '#']).next().unwrap_or(&self.target)
    }

    /// Cache key for this request
    pub fn cache_key(&self) -> &str {
        &self.target
    }
}

/// A write captured while offline, replayed later by background sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub target: String,
    pub method: String,
    pub headers: Vec<(String, Vec<u8>)>,
    /// Raw body bytes
    pub body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl QueuedRequest {
    pub fn capture(request: &InterceptedRequest) -> Self {
        Self {
            target: request.target.clone(),
            method: request.method.as_str().to_string(),
            headers: request.headers.clone(),
            body: request.body.to_vec(),
            timestamp: Utc::now(),
        }
    }

    /// Data category inferred from the target
    pub fn category(&self) -> Option<Category> {
        Category::from_target(&self.target)
    }

    /// Rebuild the original request for replay
    pub fn to_request(&self) -> Result<InterceptedRequest, http::method::InvalidMethod> {
        Ok(InterceptedRequest {
            method: Method::from_bytes(self.method.as_bytes())?,
            target: self.target.clone(),
            headers: self.headers.clone(),
            body: Bytes::from(self.body.clone()),
            destination: Destination::Other,
        })
    }
}
