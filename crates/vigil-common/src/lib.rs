//! Vigil Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared foundation for the Vigil audit trail workspace.
//!
//! # Overview
//!
//! This crate provides the pieces every other workspace member builds on:
//!
//! - **Event Model**: the canonical append-only [`event::AuditEvent`] record
//! - **Error Handling**: the [`error::AuditError`] taxonomy and result type
//! - **Integrity**: content digests and HMAC signing in [`digest`]
//! - **Configuration**: environment-backed audit settings in [`config`]
//! - **Signing Keys**: the injected [`keys::SigningKeyProvider`] seam
//! - **Logging**: tracing initialization shared by server and CLI
//!
//! # Example
//!
//! ```no_run
//! use vigil_common::event::{AuditEvent, EventType};
//! use vigil_common::digest::sha256_hex;
//!
//! let event = AuditEvent::new(EventType::QuerySql)
//!     .with_request_hash(sha256_hex(b"SELECT 1"));
//! assert_eq!(event.event_type, EventType::QuerySql);
//! ```

pub mod config;
pub mod digest;
pub mod error;
pub mod event;
pub mod keys;
pub mod logging;

// Re-export commonly used types
pub use error::{AuditError, Result};
pub use event::{AuditEvent, EventType};
