//! Graceful shutdown handling
//!
//! The signal future resolves as soon as Ctrl+C or SIGTERM arrives
//! and notifies the caller, which then bounds the drain phase so a
//! stuck connection cannot hold the process open forever.

use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Resolve on Ctrl+C or SIGTERM, then fire the notifier so the
/// caller can start its drain clock
pub async fn shutdown_signal(notify: oneshot::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    let _ = notify.send(());
}

/// Await the draining server, bounding the drain phase
///
/// The bound starts counting when `signaled` fires, so it applies to
/// connection draining only, never to normal uptime. If the window
/// elapses with connections still open, the process exits anyway.
pub async fn drain_with_timeout<S>(
    server: S,
    signaled: oneshot::Receiver<()>,
    drain_window: Duration,
) -> std::io::Result<()>
where
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = signaled => {},
    }

    info!("Waiting up to {:?} for connections to close", drain_window);
    match tokio::time::timeout(drain_window, server).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Drain window elapsed, exiting with connections still open");
            Ok(())
        },
    }
}
