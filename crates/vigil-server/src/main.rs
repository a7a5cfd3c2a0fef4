//! Vigil Server - Main entry point

use anyhow::Result;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::info;
use vigil_common::logging::{init_logging, LogConfig};
use vigil_server::{api, retention, shutdown, AppState, ServerConfig};
use vigil_store::SqliteAuditStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("vigil-server".to_string())
        .filter_directives("vigil_server=debug,tower_http=debug,axum=trace".to_string())
        .build();

    // Environment variables take precedence over the built defaults
    let log_config = log_config.clone().with_env_overrides().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Vigil Server");

    let config = ServerConfig::from_env()?;
    info!(
        "Configuration loaded - server will bind to {}:{}, retention {} days",
        config.host, config.port, config.audit.retention.days
    );

    let store = Arc::new(SqliteAuditStore::open(&config.db_path)?);
    info!("Audit store opened at {}", config.db_path.display());

    let _purge_handle = retention::spawn_purge_task(
        store.clone(),
        config.audit.retention,
        Duration::from_secs(config.purge_interval_secs),
    );
    info!("Retention purge task started");

    let state = AppState::new(store, config.audit.clone());
    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (signal_tx, signal_rx) = oneshot::channel();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::shutdown_signal(signal_tx));

    shutdown::drain_with_timeout(
        server.into_future(),
        signal_rx,
        Duration::from_secs(config.shutdown_timeout_secs),
    )
    .await?;

    info!("Server shut down gracefully");

    Ok(())
}
