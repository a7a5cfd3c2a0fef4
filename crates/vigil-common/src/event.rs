//! Audit event types and structures
//!
//! The canonical append-only record shape shared by every producer
//! (the server's enrichment middleware) and consumer (store, export
//! tool). One event is recorded per completed request attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Caller identity recorded when no identity header is supplied
/// (single-tenant appliance mode).
pub const DEFAULT_USER_ID: &str = "appliance-admin";

/// Audit event types (closed enumeration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Natural-language query submitted
    QueryNatural,
    /// Raw SQL query submitted
    QuerySql,
    /// Semantic/vector query submitted
    QuerySemantic,
    /// Dataset uploaded
    DataUpload,
    /// Dataset deleted
    DataDelete,
    /// Audit records exported
    DataExport,
    /// Dataset viewed
    DataView,
    /// Schema inspected
    SchemaView,
    /// Knowledge base updated
    KnowledgeUpdate,
    /// Knowledge base viewed
    KnowledgeView,
    /// PII detected in processed content
    PiiDetected,
    /// Access denied by policy
    AccessDenied,
    /// Request validation failed
    ValidationFailed,
    /// Protected route with no specific classification
    ApiRequest,
}

impl EventType {
    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            EventType::QueryNatural => "query_natural",
            EventType::QuerySql => "query_sql",
            EventType::QuerySemantic => "query_semantic",
            EventType::DataUpload => "data_upload",
            EventType::DataDelete => "data_delete",
            EventType::DataExport => "data_export",
            EventType::DataView => "data_view",
            EventType::SchemaView => "schema_view",
            EventType::KnowledgeUpdate => "knowledge_update",
            EventType::KnowledgeView => "knowledge_view",
            EventType::PiiDetected => "pii_detected",
            EventType::AccessDenied => "access_denied",
            EventType::ValidationFailed => "validation_failed",
            EventType::ApiRequest => "api_request",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "query_natural" => Ok(EventType::QueryNatural),
            "query_sql" => Ok(EventType::QuerySql),
            "query_semantic" => Ok(EventType::QuerySemantic),
            "data_upload" => Ok(EventType::DataUpload),
            "data_delete" => Ok(EventType::DataDelete),
            "data_export" => Ok(EventType::DataExport),
            "data_view" => Ok(EventType::DataView),
            "schema_view" => Ok(EventType::SchemaView),
            "knowledge_update" => Ok(EventType::KnowledgeUpdate),
            "knowledge_view" => Ok(EventType::KnowledgeView),
            "pii_detected" => Ok(EventType::PiiDetected),
            "access_denied" => Ok(EventType::AccessDenied),
            "validation_failed" => Ok(EventType::ValidationFailed),
            "api_request" => Ok(EventType::ApiRequest),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

/// Audit event structure
///
/// Immutable once persisted. `id` ordering within a single store
/// reflects persistence order, not request-arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event ID (assigned by the store at persistence time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Point in time the request began processing (UTC)
    pub timestamp: DateTime<Utc>,

    /// Event type
    pub event_type: EventType,

    /// Caller identity (sentinel default in single-tenant mode)
    pub user_id: String,

    /// Logical session correlator, client-supplied or generated
    pub session_id: String,

    /// Network origin of the request
    pub source_ip: String,

    /// SHA-256 hex digest of the inbound request body
    pub request_hash: String,

    /// SHA-256 hex digest of the outbound response body
    pub response_hash: String,

    /// Measured handler latency in milliseconds
    pub duration_ms: f64,

    /// Event-type-specific structured payload (JSON)
    pub details: JsonValue,
}

impl AuditEvent {
    /// Create a new audit event with the current timestamp
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            event_type,
            user_id: DEFAULT_USER_ID.to_string(),
            session_id: String::new(),
            source_ip: String::new(),
            request_hash: String::new(),
            response_hash: String::new(),
            duration_ms: 0.0,
            details: serde_json::json!({}),
        }
    }

    /// Set the timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the caller identity
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the session correlator
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Set the network origin
    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }

    /// Set the request body digest
    #[must_use]
    pub fn with_request_hash(mut self, hash: impl Into<String>) -> Self {
        self.request_hash = hash.into();
        self
    }

    /// Set the response body digest
    #[must_use]
    pub fn with_response_hash(mut self, hash: impl Into<String>) -> Self {
        self.response_hash = hash.into();
        self
    }

    /// Set the measured handler latency
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the structured details payload
    #[must_use]
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = details;
        self
    }

    /// Mark the outcome in `details` without replacing the rest of
    /// the payload. Failed requests still produce an event; the
    /// outcome marker is how that failure is recorded.
    pub fn set_outcome(&mut self, success: bool, error: Option<&str>) {
        if let Some(obj) = self.details.as_object_mut() {
            obj.insert("success".to_string(), JsonValue::Bool(success));
            if let Some(message) = error {
                obj.insert("error".to_string(), JsonValue::String(message.to_string()));
            }
        }
    }
}

impl Default for AuditEvent {
    fn default() -> Self {
        Self::new(EventType::ApiRequest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_as_str() {
        assert_eq!(EventType::QuerySql.as_str(), "query_sql");
        assert_eq!(EventType::PiiDetected.as_str(), "pii_detected");
    }

    #[test]
    fn test_event_type_round_trip() {
        for event_type in [
            EventType::QueryNatural,
            EventType::DataUpload,
            EventType::AccessDenied,
            EventType::ApiRequest,
        ] {
            let parsed: EventType = event_type.as_str().parse().unwrap();
            assert_eq!(parsed, event_type);
        }

        assert!("not_a_type".parse::<EventType>().is_err());
    }

    #[test]
    fn test_audit_event_builder() {
        let event = AuditEvent::new(EventType::DataUpload)
            .with_user("analyst-1")
            .with_session("sess-42")
            .with_source_ip("10.0.0.5")
            .with_request_hash("abc")
            .with_response_hash("def")
            .with_duration_ms(12.5)
            .with_details(json!({"rows": 100}));

        assert_eq!(event.user_id, "analyst-1");
        assert_eq!(event.session_id, "sess-42");
        assert_eq!(event.source_ip, "10.0.0.5");
        assert_eq!(event.duration_ms, 12.5);
        assert!(event.id.is_none());
    }

    #[test]
    fn test_default_user_is_sentinel() {
        let event = AuditEvent::new(EventType::QueryNatural);
        assert_eq!(event.user_id, DEFAULT_USER_ID);
    }

    #[test]
    fn test_set_outcome() {
        let mut event =
            AuditEvent::new(EventType::QuerySql).with_details(json!({"rows_returned": 3}));
        event.set_outcome(false, Some("table not found"));

        assert_eq!(event.details["success"], json!(false));
        assert_eq!(event.details["error"], json!("table not found"));
        assert_eq!(event.details["rows_returned"], json!(3));
    }

    #[test]
    fn test_event_serialization_skips_unassigned_id() {
        let event = AuditEvent::new(EventType::QuerySql);
        let json = serde_json::to_string(&event).unwrap();

        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"event_type\":\"query_sql\""));
    }
}
