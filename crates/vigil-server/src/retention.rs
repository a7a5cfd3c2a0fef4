//! Periodic retention purge
//!
//! Deletes events that have aged out of the retention window. The
//! cutoff is computed at the start of each run, so events recorded
//! while a purge is in progress are never eligible.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vigil_common::config::RetentionPolicy;
use vigil_store::AuditStore;

/// Spawn the background purge task
///
/// Runs immediately, then on the configured interval until the
/// process exits.
pub fn spawn_purge_task(
    store: Arc<dyn AuditStore>,
    retention: RetentionPolicy,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let cutoff = retention.cutoff();
            match store.purge_older_than(cutoff).await {
                Ok(deleted) if deleted > 0 => {
                    info!(deleted, cutoff = %cutoff, "Retention purge completed");
                },
                Ok(_) => {},
                Err(e) => {
                    error!(error = %e, "Retention purge failed");
                },
            }
        }
    })
}
