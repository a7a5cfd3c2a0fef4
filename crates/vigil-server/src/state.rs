//! Shared application state

use std::sync::Arc;
use vigil_common::config::AuditConfig;
use vigil_store::AuditStore;

/// Application state shared across handlers and the audit layer
#[derive(Clone)]
pub struct AppState {
    /// The process-local audit store
    pub store: Arc<dyn AuditStore>,

    /// Audit subsystem configuration
    pub audit_config: Arc<AuditConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn AuditStore>, audit_config: AuditConfig) -> Self {
        Self { store, audit_config: Arc::new(audit_config) }
    }
}
