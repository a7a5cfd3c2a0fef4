//! Audit store trait and SQLite implementation

use crate::schema;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use vigil_common::error::{AuditError, Result};
use vigil_common::event::{AuditEvent, EventType};

/// Filters for querying persisted events
///
/// Results are always ordered by `id` ascending.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Events at or after this instant
    pub from: Option<DateTime<Utc>>,

    /// Events at or before this instant
    pub to: Option<DateTime<Utc>>,

    /// Filter by event type
    pub event_type: Option<EventType>,

    /// Filter by caller identity
    pub user_id: Option<String>,

    /// Maximum number of events to return
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Restrict to a time range
    #[must_use]
    pub fn with_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Restrict to one event type
    #[must_use]
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Restrict to one caller
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Cap the number of returned events
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the WHERE clause and its parameters
    fn conditions(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(from) = self.from {
            params.push(Box::new(from.to_rfc3339()));
            conditions.push(format!("timestamp >= ?{}", params.len()));
        }
        if let Some(to) = self.to {
            params.push(Box::new(to.to_rfc3339()));
            conditions.push(format!("timestamp <= ?{}", params.len()));
        }
        if let Some(event_type) = self.event_type {
            params.push(Box::new(event_type.as_str().to_string()));
            conditions.push(format!("event_type = ?{}", params.len()));
        }
        if let Some(ref user_id) = self.user_id {
            params.push(Box::new(user_id.clone()));
            conditions.push(format!("user_id = ?{}", params.len()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        (clause, params)
    }
}

/// Trait for audit event persistence (dependency injection)
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one event and return its assigned id
    ///
    /// Safe to call concurrently; writes are serialized at the
    /// storage layer. The id is handed back only after the write
    /// completes, and ordering reflects write-completion order.
    async fn append(&self, event: AuditEvent) -> Result<i64>;

    /// Return matching events ordered by `id` ascending
    async fn query(&self, query: &EventQuery) -> Result<Vec<AuditEvent>>;

    /// Count matching events without materializing them
    async fn count(&self, query: &EventQuery) -> Result<u64>;

    /// Delete events strictly older than the cutoff
    ///
    /// The cutoff is computed by the caller before deletion begins, so
    /// events born during the purge are never eligible. Returns the
    /// number of deleted events.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// SQLite-backed audit store, local to one service process
pub struct SqliteAuditStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Open (or create) a store at the given path
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuditError::storage(format!(
                    "Failed to create audit directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| {
            AuditError::storage(format!(
                "Failed to open audit database at '{}': {}",
                db_path.display(),
                e
            ))
        })?;

        schema::init_schema(&conn)?;

        Ok(Self { db: Arc::new(Mutex::new(conn)) })
    }

    /// Create an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AuditError::storage(format!("Failed to create in-memory database: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(Self { db: Arc::new(Mutex::new(conn)) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| AuditError::storage(format!("Failed to acquire database lock: {}", e)))
    }
}

/// Map one database row to an event
fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<AuditEvent> {
    let timestamp_str = row.get::<_, String>(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    let event_type_str = row.get::<_, String>(2)?;
    let event_type: EventType = event_type_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    let details_str = row.get::<_, String>(9)?;
    let details = serde_json::from_str(&details_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(AuditEvent {
        id: Some(row.get::<_, i64>(0)?),
        timestamp,
        event_type,
        user_id: row.get::<_, String>(3)?,
        session_id: row.get::<_, String>(4)?,
        source_ip: row.get::<_, String>(5)?,
        request_hash: row.get::<_, String>(6)?,
        response_hash: row.get::<_, String>(7)?,
        duration_ms: row.get::<_, f64>(8)?,
        details,
    })
}

const EVENT_COLUMNS: &str = "id, timestamp, event_type, user_id, session_id, source_ip, \
                             request_hash, response_hash, duration_ms, details";

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, event: AuditEvent) -> Result<i64> {
        let details_json = serde_json::to_string(&event.details)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO audit_events (
                timestamp, event_type, user_id, session_id, source_ip,
                request_hash, response_hash, duration_ms, details
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                event.timestamp.to_rfc3339(),
                event.event_type.as_str(),
                event.user_id,
                event.session_id,
                event.source_ip,
                event.request_hash,
                event.response_hash,
                event.duration_ms,
                details_json,
            ],
        )
        .map_err(|e| AuditError::storage(format!("Failed to insert audit event: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<AuditEvent>> {
        let (clause, mut query_params) = query.conditions();

        let mut sql = format!("SELECT {} FROM audit_events{} ORDER BY id ASC", EVENT_COLUMNS, clause);
        if let Some(limit) = query.limit {
            query_params.push(Box::new(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", query_params.len()));
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::storage(format!("Failed to prepare query: {}", e)))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), event_from_row)
            .map_err(|e| AuditError::storage(format!("Failed to query events: {}", e)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AuditError::storage(format!("Failed to read event row: {}", e)))
    }

    async fn count(&self, query: &EventQuery) -> Result<u64> {
        let (clause, query_params) = query.conditions();
        let sql = format!("SELECT COUNT(*) FROM audit_events{}", clause);

        let conn = self.lock()?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::storage(format!("Failed to count events: {}", e)))?;

        Ok(count as u64)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM audit_events WHERE timestamp < ?1",
                params![cutoff.to_rfc3339()],
            )
            .map_err(|e| AuditError::storage(format!("Failed to purge events: {}", e)))?;

        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff, "Purged audit events outside retention window");
        }

        Ok(deleted as u64)
    }
}
