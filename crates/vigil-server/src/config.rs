//! Server configuration
//!
//! Loaded once at startup from environment variables. Invalid values
//! are fatal; the service does not start partially configured.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vigil_common::config::AuditConfig;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "./audit/audit.db";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Path to the SQLite audit store
    pub db_path: PathBuf,

    /// Grace period for in-flight requests at shutdown
    pub shutdown_timeout_secs: u64,

    /// Interval between retention purge runs
    pub purge_interval_secs: u64,

    /// Audit subsystem configuration
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `VIGIL_HOST`: bind host
    /// - `VIGIL_PORT`: bind port
    /// - `VIGIL_DB_PATH`: SQLite store path
    /// - `VIGIL_SHUTDOWN_TIMEOUT_SECS`: graceful shutdown window
    /// - `VIGIL_PURGE_INTERVAL_SECS`: retention purge cadence
    ///
    /// Audit variables are read by [`AuditConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("VIGIL_HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("VIGIL_PORT") {
            config.port = port.parse().context("Invalid VIGIL_PORT")?;
        }

        if let Ok(path) = std::env::var("VIGIL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(timeout) = std::env::var("VIGIL_SHUTDOWN_TIMEOUT_SECS") {
            config.shutdown_timeout_secs =
                timeout.parse().context("Invalid VIGIL_SHUTDOWN_TIMEOUT_SECS")?;
        }

        if let Ok(interval) = std::env::var("VIGIL_PURGE_INTERVAL_SECS") {
            config.purge_interval_secs =
                interval.parse().context("Invalid VIGIL_PURGE_INTERVAL_SECS")?;
        }

        config.audit = AuditConfig::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration at startup
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            anyhow::bail!("Bind host must not be empty");
        }

        if self.purge_interval_secs == 0 {
            anyhow::bail!("Purge interval must be greater than 0");
        }

        self.audit.validate()?;

        Ok(())
    }
}
