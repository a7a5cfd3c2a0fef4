//! Vigil Audit Store
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Durable, queryable persistence for audit events.
//!
//! Each service instance owns exactly one store; stores are never
//! shared or merged across services. The store is the single
//! serialization point of the audit core: concurrent appends are
//! serialized behind one connection lock, and `id` assignment is
//! monotonic in write-completion order.
//!
//! Events are written once and never mutated; the only deletion path
//! is the retention purge.
//!
//! # Example
//!
//! ```no_run
//! use vigil_store::{AuditStore, EventQuery, SqliteAuditStore};
//! use vigil_common::event::{AuditEvent, EventType};
//!
//! # async fn example() -> vigil_common::Result<()> {
//! let store = SqliteAuditStore::open("audit/audit.db")?;
//! let id = store.append(AuditEvent::new(EventType::QuerySql)).await?;
//! let events = store.query(&EventQuery::default()).await?;
//! assert_eq!(events.last().and_then(|e| e.id), Some(id));
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod store;

pub use store::{AuditStore, EventQuery, SqliteAuditStore};
