/**
 * Chat Ping Offline Proxy Entry Point
 *
 * Runs the worker context as a local HTTP proxy in front of the Chat Ping
 * server. Point the application at the proxy port to get offline caching
 * and queued writes.
 */
use chatping_offline::client::notify::TracingNotifier;
use chatping_offline::client::Config;
use chatping_offline::worker::proxy::{create_router, ProxyState};
use chatping_offline::worker::{ReqwestTransport, Worker, OFFLINE_PARTITION_FILE};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::load()?;
    tracing::info!("Proxying {}", config.server_url());

    let data_dir = config.store().dir();
    tokio::fs::create_dir_all(&data_dir).await?;

    let transport = ReqwestTransport::new(config.server_url(), config.request_timeout())?;
    let worker = Worker::new(transport, config.worker(), Arc::new(TracingNotifier))
        .with_offline_file(data_dir.join(OFFLINE_PARTITION_FILE));
    let worker = Arc::new(worker);
    worker.install().await?;
    worker.activate().await;

    // Queued writes are retried on the worker's replay timer
    let (handle, _worker_task) = worker.clone().spawn(None);
    let app = create_router(ProxyState { worker, handle });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.worker().proxy_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Offline proxy listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
