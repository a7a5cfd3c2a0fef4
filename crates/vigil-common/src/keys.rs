//! Signing key provisioning
//!
//! The export MAC key is an injected dependency rather than a
//! hardcoded value. Providers only hold the key in process memory;
//! rotation and external key management are future hardening items.

use crate::error::{AuditError, Result};

/// Environment variable holding the export signing key
pub const SIGNING_KEY_ENV: &str = "VIGIL_SIGNING_KEY";

/// Source of the HMAC signing key used for export and verification
pub trait SigningKeyProvider: Send + Sync {
    /// Return the signing key bytes
    ///
    /// A missing or empty key is a `Configuration` error: exports must
    /// never fall back to a silent default key.
    fn signing_key(&self) -> Result<Vec<u8>>;
}

/// Reads the signing key from `VIGIL_SIGNING_KEY`
#[derive(Debug, Clone, Default)]
pub struct EnvKeyProvider;

impl EnvKeyProvider {
    /// Create a new environment-backed provider
    pub fn new() -> Self {
        Self
    }
}

impl SigningKeyProvider for EnvKeyProvider {
    fn signing_key(&self) -> Result<Vec<u8>> {
        let key = std::env::var(SIGNING_KEY_ENV).map_err(|_| {
            AuditError::config(format!(
                "Signing key not provisioned: set {} before exporting",
                SIGNING_KEY_ENV
            ))
        })?;

        if key.trim().is_empty() {
            return Err(AuditError::config(format!("{} is set but empty", SIGNING_KEY_ENV)));
        }

        Ok(key.into_bytes())
    }
}

/// Fixed in-memory key, for tests and embedded callers
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: Vec<u8>,
}

impl StaticKeyProvider {
    /// Create a provider holding the given key bytes
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl SigningKeyProvider for StaticKeyProvider {
    fn signing_key(&self) -> Result<Vec<u8>> {
        if self.key.is_empty() {
            return Err(AuditError::config("Static signing key is empty"));
        }
        Ok(self.key.clone())
    }
}
