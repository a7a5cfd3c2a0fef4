//! `vigil list` command implementation

use crate::error::{CliError, Result};
use colored::Colorize;
use std::path::PathBuf;
use vigil_common::event::EventType;
use vigil_store::{AuditStore, EventQuery, SqliteAuditStore};

/// List recent audit events
pub async fn run(
    db_path: PathBuf,
    limit: usize,
    event_type: Option<String>,
    user: Option<String>,
) -> Result<()> {
    if !db_path.exists() {
        println!("{} No audit database found at {}", "→".cyan(), db_path.display());
        return Ok(());
    }

    let store = SqliteAuditStore::open(&db_path)?;

    let mut query = EventQuery::default();
    if let Some(raw) = event_type {
        let parsed: EventType = raw.parse().map_err(CliError::invalid_argument)?;
        query = query.with_event_type(parsed);
    }
    if let Some(user) = user {
        query = query.with_user(user);
    }

    let events = store.query(&query).await?;

    if events.is_empty() {
        println!("{} No audit events found", "→".cyan());
        return Ok(());
    }

    // Query order is id-ascending; show the tail of the trail
    let recent = &events[events.len().saturating_sub(limit)..];
    println!("{} Showing {} most recent events:", "→".cyan(), recent.len());
    println!();

    for event in recent {
        let id = event.id.map(|id| format!("#{}", id)).unwrap_or_else(|| "#?".to_string());
        let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string();

        println!(
            "{} {} {}",
            id.bright_black(),
            event.event_type.as_str().bold(),
            timestamp.dimmed()
        );
        println!("  {} {}", "User:".cyan(), event.user_id);
        println!("  {} {}", "Source:".cyan(), event.source_ip);

        if let Some(obj) = event.details.as_object() {
            for (key, value) in obj {
                let value_str = match value {
                    serde_json::Value::String(s) => s.clone(),
                    _ => value.to_string(),
                };
                if value_str.len() < 100 {
                    println!("  {} {}", format!("{}:", key).dimmed(), value_str);
                }
            }
        }

        println!();
    }

    Ok(())
}
