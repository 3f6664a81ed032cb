//! Worker interception against a real origin, taken down mid-test

use crate::common::*;
use assert_matches::assert_matches;
use chatping_offline::client::notify::TracingNotifier;
use chatping_offline::shared::config::WorkerConfig;
use chatping_offline::shared::{InterceptError, SyncTag};
use chatping_offline::worker::interceptor::{CACHE_MISS_BODY, OFFLINE_PAGE};
use chatping_offline::worker::request::{Destination, InterceptedRequest};
use chatping_offline::worker::{ReqwestTransport, Worker};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_bytes, method, path};
use wiremock::{Mock, ResponseTemplate};

fn worker_for(origin: &str) -> Worker<ReqwestTransport> {
    let transport = ReqwestTransport::new(origin, Duration::from_secs(2)).unwrap();
    Worker::new(transport, &WorkerConfig::default(), Arc::new(TracingNotifier))
}

#[tokio::test]
async fn test_cache_first_hits_origin_once() {
    let addr = free_addr();
    let server = server_at(addr).await;
    Mock::given(method("GET"))
        .and(path("/static/js/app.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("console.log('ping')"))
        .expect(1)
        .mount(&server)
        .await;

    let worker = worker_for(&server.uri());
    let request = InterceptedRequest::get("/static/js/app.js");
    let first = worker.fetch(&request).await.unwrap();
    let second = worker.fetch(&request).await.unwrap();

    assert_eq!(first.body, b"console.log('ping')");
    assert_eq!(second.body, first.body);
    server.verify().await;
}

#[tokio::test]
async fn test_cache_first_miss_while_offline() {
    let worker = worker_for(&format!("http://{}", free_addr()));
    let response = worker.fetch(&InterceptedRequest::get("/static/css/missing.css")).await.unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.body, CACHE_MISS_BODY.as_bytes());
}

#[tokio::test]
async fn test_network_first_falls_back_to_last_good_copy() {
    let server = server_at(free_addr()).await;
    Mock::given(method("GET"))
        .and(path("/api/attendance"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("connection", "close")
                .set_body_json(serde_json::json!({"present": 21})),
        )
        .mount(&server)
        .await;

    let worker = worker_for(&server.uri());
    let request = InterceptedRequest::get("/api/attendance");
    let online = worker.fetch(&request).await.unwrap();
    drop(server);

    let offline = worker.fetch(&request).await.unwrap();
    assert_eq!(offline, online);

    let uncached = worker.fetch(&InterceptedRequest::get("/api/notifications")).await;
    assert_matches!(uncached, Err(InterceptError::Network { .. }));

    let page = worker
        .fetch(&InterceptedRequest::get("/dashboard").with_destination(Destination::Document))
        .await
        .unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.body, OFFLINE_PAGE.as_bytes());
}

#[tokio::test]
async fn test_offline_write_replays_byte_for_byte() {
    let addr = free_addr();
    let worker = worker_for(&format!("http://{}", addr));

    let body: Vec<u8> = vec![0, 159, 146, 150, b'{', b'}'];
    let request = InterceptedRequest::new(Method::PUT, "/api/attendance/checkin?day=4")
        .with_header("x-client", "a")
        .with_header("x-client", "b")
        .with_body(body.clone());

    let ack = worker.fetch(&request).await.unwrap();
    assert_eq!(ack.status, 202);
    assert_eq!(worker.background().pending_count().await, 1);

    let server = server_at(addr).await;
    Mock::given(method("PUT"))
        .and(path("/api/attendance/checkin"))
        .and(body_bytes(body.clone()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let report = worker.background().fire(SyncTag::Attendance).await;
    assert_eq!(report.totals.succeeded, 1);
    assert_eq!(worker.background().pending_count().await, 0);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("day=4"));
    let values: Vec<_> = received[0].headers.get_all("x-client").iter().collect();
    assert_eq!(values.len(), 2);
    server.verify().await;
}

#[tokio::test]
async fn test_replay_keeps_request_when_origin_still_rejects() {
    let addr = free_addr();
    let worker = worker_for(&format!("http://{}", addr));
    worker
        .fetch(&InterceptedRequest::new(Method::POST, "/api/chat/send").with_body("hi"))
        .await
        .unwrap();

    let server = server_at(addr).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = worker.background().fire(SyncTag::General).await;
    assert_eq!(report.totals.failed, 1);
    assert_eq!(worker.background().pending_count().await, 1);
}
