//! Mock origin helpers for integration tests
//!
//! Thin wrappers over `wiremock` for the sync endpoints and the proxied
//! origin.

use chatping_offline::client::offline::HttpRemote;
use std::net::SocketAddr;
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Server answering every category sync `POST` with `response`
pub async fn sync_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/[a-z_]+/sync$"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

/// Remote pointed at a mock server
pub fn http_remote(server: &MockServer) -> HttpRemote {
    HttpRemote::with_base_url(server.uri(), Duration::from_secs(5)).expect("Failed to build remote")
}

/// Paths of every request the server has seen, in arrival order
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

/// A local address nothing is listening on yet
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to reserve a port");
    listener.local_addr().expect("Listener has no address")
}

/// Start a mock server on a specific address
pub async fn server_at(addr: SocketAddr) -> MockServer {
    let listener = std::net::TcpListener::bind(addr).expect("Failed to bind mock origin");
    MockServer::builder().listener(listener).start().await
}
