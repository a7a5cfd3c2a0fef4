//! SQLite schema for the audit store

use rusqlite::Connection;
use vigil_common::error::{AuditError, Result};

/// Initialize the audit store schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,

            -- Caller context
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            source_ip TEXT NOT NULL,

            -- Content integrity
            request_hash TEXT NOT NULL,
            response_hash TEXT NOT NULL,

            duration_ms REAL NOT NULL DEFAULT 0,
            details TEXT NOT NULL,  -- JSON

            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        [],
    )
    .map_err(|e| AuditError::storage(format!("Failed to create audit_events table: {}", e)))?;

    // Indexes for the query contract: time range, event_type, user_id
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON audit_events(timestamp)",
        [],
    )
    .map_err(|e| AuditError::storage(format!("Failed to create timestamp index: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_type ON audit_events(event_type)",
        [],
    )
    .map_err(|e| AuditError::storage(format!("Failed to create event_type index: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_user ON audit_events(user_id)",
        [],
    )
    .map_err(|e| AuditError::storage(format!("Failed to create user_id index: {}", e)))?;

    Ok(())
}
