//! Audit enrichment layer
//!
//! Intercepts every routed request, derives caller context, hashes
//! both body directions, and records one event per request attempt.

pub mod classify;
pub mod middleware;

pub use middleware::AuditLayer;
