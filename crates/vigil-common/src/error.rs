//! Error types for Vigil

use thiserror::Error;

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Main error type for the audit subsystem
///
/// The first four variants form the failure taxonomy every component
/// reports against; the rest are passthroughs for ambient failures.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The store cannot accept or serve events (disk or backing failure)
    #[error("Audit store unavailable: {0}")]
    StorageUnavailable(String),

    /// Verification detected a digest or signature inconsistency
    #[error("Integrity mismatch: {0}")]
    IntegrityMismatch(String),

    /// Caller attempted an operation outside the allowed surface.
    /// Reserved for store backends that cannot honor the full
    /// `AuditStore` contract; the bundled SQLite store implements the
    /// whole surface.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Required signing material or retention settings missing at start
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// Create a storage-unavailable error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create an integrity-mismatch error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityMismatch(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error indicates evidence of tampering rather than
    /// an operational fault.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::IntegrityMismatch(_))
    }
}
