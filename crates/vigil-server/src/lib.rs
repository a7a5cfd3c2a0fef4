//! Vigil Server
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP service that hosts the audit enrichment middleware. Every
//! routed request passes through the audit layer, which derives caller
//! context, hashes both body directions, and records exactly one
//! event per request attempt in the local store.

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod retention;
pub mod shutdown;
pub mod state;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;
