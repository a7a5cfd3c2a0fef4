//! `vigil purge` command implementation

use crate::error::{CliError, Result};
use colored::Colorize;
use std::path::PathBuf;
use vigil_common::config::RetentionPolicy;
use vigil_store::{AuditStore, SqliteAuditStore};

/// Delete events older than the retention window
pub async fn run(db_path: PathBuf, retention_days: u32) -> Result<()> {
    if retention_days == 0 {
        return Err(CliError::invalid_argument(
            "--retention-days must be at least 1; a zero window would delete the whole trail",
        ));
    }

    if !db_path.exists() {
        return Err(CliError::file_not_found(db_path.display().to_string()));
    }

    let store = SqliteAuditStore::open(&db_path)?;
    let cutoff = RetentionPolicy::new(retention_days).cutoff();
    let deleted = store.purge_older_than(cutoff).await?;

    if deleted == 0 {
        println!("{} Nothing to purge; all events are within {} days", "→".cyan(), retention_days);
    } else {
        println!(
            "{} Purged {} events older than {} ({} day retention)",
            "✓".green(),
            deleted,
            cutoff.format("%Y-%m-%d"),
            retention_days
        );
    }

    Ok(())
}
