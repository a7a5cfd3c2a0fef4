//! `vigil export` command implementation

use crate::error::{CliError, Result};
use crate::export::{bundle, seal_bundle, write_events_csv};
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use std::path::PathBuf;
use vigil_common::keys::{EnvKeyProvider, SigningKeyProvider};
use vigil_store::{AuditStore, EventQuery, SqliteAuditStore};

/// Export a window of audit events as a signed bundle
pub async fn run(
    db_path: PathBuf,
    output: PathBuf,
    days: u32,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    if !db_path.exists() {
        return Err(CliError::file_not_found(format!(
            "{} (no audit database; has the server ever run?)",
            db_path.display()
        )));
    }

    // Key is resolved before touching the store: a misconfigured
    // export should fail before producing partial output.
    let key = EnvKeyProvider::new().signing_key()?;

    let (start_date, end_date) = resolve_window(days, from.as_deref(), to.as_deref())?;

    let store = SqliteAuditStore::open(&db_path)?;
    let query = EventQuery::default().with_range(start_date, end_date);
    let events = store.query(&query).await?;

    let record_count = write_events_csv(&events, &output)?;
    let metadata = seal_bundle(&output, &key, start_date, end_date, record_count)?;

    println!(
        "{} Exported {} events ({} to {})",
        "✓".green(),
        record_count,
        start_date.format("%Y-%m-%d"),
        end_date.format("%Y-%m-%d")
    );
    println!("  {} {}", "Data:".cyan(), output.display());
    println!("  {} {}", "Signature:".cyan(), bundle::sig_path(&output).display());
    println!("  {} {}", "Metadata:".cyan(), bundle::meta_path(&output).display());
    println!("  {} {}", "Content hash:".cyan(), metadata.content_hash);

    Ok(())
}

/// Resolve the export window from `--days` or `--from`/`--to`
fn resolve_window(
    days: u32,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (from, to) {
        (Some(from), Some(to)) => {
            let start = parse_rfc3339(from)?;
            let end = parse_rfc3339(to)?;
            if start > end {
                return Err(CliError::invalid_argument(format!(
                    "--from ({}) is after --to ({})",
                    from, to
                )));
            }
            Ok((start, end))
        },
        _ => {
            let end = Utc::now();
            Ok((end - Duration::days(i64::from(days)), end))
        },
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CliError::invalid_argument(format!(
                "'{}' is not an RFC3339 timestamp (e.g. 2026-08-01T00:00:00Z): {}",
                raw, e
            ))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_window_from_days() {
        let (start, end) = resolve_window(30, None, None).unwrap();
        assert!(end - start == Duration::days(30));
    }

    #[test]
    fn test_resolve_window_explicit_range() {
        let (start, end) =
            resolve_window(30, Some("2026-01-01T00:00:00Z"), Some("2026-02-01T00:00:00Z")).unwrap();
        assert_eq!(end - start, Duration::days(31));
    }

    #[test]
    fn test_resolve_window_rejects_inverted_range() {
        let result =
            resolve_window(30, Some("2026-02-01T00:00:00Z"), Some("2026-01-01T00:00:00Z"));
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_resolve_window_rejects_bad_timestamp() {
        let result = resolve_window(30, Some("yesterday"), Some("2026-01-01T00:00:00Z"));
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
