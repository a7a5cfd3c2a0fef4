//! Route-to-event-type classification

use axum::http::{Method, StatusCode};
use vigil_common::event::EventType;

/// Routes that are never audited
const EXCLUDED_PATHS: &[&str] = &["/health", "/version"];

/// Whether a path is on the audit allow-list
pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PATHS.contains(&path)
}

/// Classify an event type from the request route and method
///
/// Unrecognized protected routes fall back to the catch-all type
/// rather than being dropped.
pub fn classify(method: &Method, path: &str) -> EventType {
    if path.starts_with("/api/v1/query/natural") {
        EventType::QueryNatural
    } else if path.starts_with("/api/v1/query/sql") {
        EventType::QuerySql
    } else if path.starts_with("/api/v1/query/semantic") {
        EventType::QuerySemantic
    } else if path.starts_with("/api/v1/data/upload") {
        EventType::DataUpload
    } else if path.starts_with("/api/v1/data/") {
        match *method {
            Method::DELETE => EventType::DataDelete,
            _ => EventType::DataView,
        }
    } else if path.starts_with("/api/v1/schema") {
        EventType::SchemaView
    } else if path.starts_with("/api/v1/knowledge") {
        match *method {
            Method::GET => EventType::KnowledgeView,
            _ => EventType::KnowledgeUpdate,
        }
    } else {
        EventType::ApiRequest
    }
}

/// Override the route classification from the response status
///
/// Denials and validation rejections are recorded as such regardless
/// of which route produced them.
pub fn refine_with_status(route_type: EventType, status: StatusCode) -> EventType {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EventType::AccessDenied,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => EventType::ValidationFailed,
        _ => route_type,
    }
}
