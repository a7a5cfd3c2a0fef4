//! CSV serialization of audit events

use crate::error::Result;
use std::path::Path;
use vigil_common::event::AuditEvent;

/// Fixed column order of exported CSV files. Verification depends on
/// byte-stable output, so this order never changes.
pub const CSV_COLUMNS: [&str; 10] = [
    "id",
    "timestamp",
    "event_type",
    "user_id",
    "session_id",
    "source_ip",
    "request_hash",
    "response_hash",
    "duration_ms",
    "details",
];

/// Write events to a CSV file, returning the record count
///
/// The header row is always written, even for an empty window.
pub fn write_events_csv(events: &[AuditEvent], path: &Path) -> Result<u64> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_COLUMNS)?;

    for event in events {
        writer.write_record(&[
            event.id.map(|id| id.to_string()).unwrap_or_default(),
            event.timestamp.to_rfc3339(),
            event.event_type.as_str().to_string(),
            event.user_id.clone(),
            event.session_id.clone(),
            event.source_ip.clone(),
            event.request_hash.clone(),
            event.response_hash.clone(),
            event.duration_ms.to_string(),
            serde_json::to_string(&event.details)?,
        ])?;
    }

    writer.flush()?;
    Ok(events.len() as u64)
}
