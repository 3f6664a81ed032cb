/**
 * Worker Proxy
 *
 * Local HTTP front end for the worker. Every request that does not hit a
 * control route is converted into an `InterceptedRequest` and answered by
 * the worker's interceptor, so an application pointed at the proxy gets
 * offline caching and write queueing without knowing about either.
 *
 * # Routes
 *
 * - `POST /__worker/message` - JSON `WorkerMessage`, forwarded to the
 *   worker's message loop (`202`, or `503` once the loop has stopped)
 * - `GET /__worker/status` - lifecycle state and queued request count
 * - everything else - intercepted
 */
use crate::shared::{InterceptError, WorkerMessage};
use crate::worker::cache::CachedResponse;
use crate::worker::request::{Destination, InterceptedRequest};
use crate::worker::transport::Transport;
use crate::worker::{Worker, WorkerHandle};
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Largest request body the proxy will buffer
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state of the proxy routes
pub struct ProxyState<T> {
    pub worker: Arc<Worker<T>>,
    pub handle: WorkerHandle,
}

impl<T> Clone for ProxyState<T> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
            handle: self.handle.clone(),
        }
    }
}

/// Build the proxy router
pub fn create_router<T: Transport + 'static>(state: ProxyState<T>) -> Router {
    Router::new()
        .route("/__worker/message", post(post_message::<T>))
        .route("/__worker/status", get(get_status::<T>))
        .fallback(intercept::<T>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn intercept<T: Transport + 'static>(State(state): State<ProxyState<T>>, request: Request) -> Response {
    let request = match into_intercepted(request).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.worker.fetch(&request).await {
        Ok(cached) => into_response(cached),
        Err(InterceptError::Network { target, message }) => {
            tracing::debug!("No fallback for {}: {}", target, message);
            (StatusCode::BAD_GATEWAY, message).into_response()
        }
    }
}

async fn post_message<T: Transport + 'static>(
    State(state): State<ProxyState<T>>,
    Json(message): Json<WorkerMessage>,
) -> StatusCode {
    match state.handle.send(message).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::warn!("Worker message loop is gone, dropping {:?}", e.0);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn get_status<T: Transport + 'static>(State(state): State<ProxyState<T>>) -> Json<serde_json::Value> {
    let worker = &state.worker;
    Json(serde_json::json!({
        "state": format!("{:?}", worker.state().await),
        "pending_requests": worker.background().pending_count().await,
        "registered": worker
            .background()
            .registered()
            .await
            .iter()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>(),
    }))
}

async fn into_intercepted(request: Request) -> Result<InterceptedRequest, Response> {
    let (parts, body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response())?;

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
        .collect();

    Ok(InterceptedRequest {
        method: parts.method,
        target,
        headers,
        body,
        destination: destination_of(&parts.headers),
    })
}

/// Navigations announce themselves through `Sec-Fetch-Dest` or an HTML `Accept`
fn destination_of(headers: &HeaderMap) -> Destination {
    if header_str(headers, "sec-fetch-dest") == Some("document") {
        return Destination::Document;
    }
    match header_str(headers, header::ACCEPT.as_str()) {
        Some(accept) if accept.contains("text/html") => Destination::Document,
        _ => Destination::Other,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn into_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in &cached.headers {
        builder = builder.header(name.as_str(), value.as_slice());
    }
    builder.body(Body::from(cached.body)).unwrap_or_else(|e| {
        tracing::warn!("Could not rebuild cached response: {}", e);
        StatusCode::BAD_GATEWAY.into_response()
    })
}
