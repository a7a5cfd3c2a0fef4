//! Audit subsystem configuration
//!
//! Loaded once at process start from environment variables and
//! immutable for the process lifetime.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default retention window in days (seven years, multi-year
/// regulatory retention).
pub const DEFAULT_RETENTION_DAYS: u32 = 2555;

/// Default cap on the number of body bytes hashed per request or
/// response (1 MiB). Larger bodies are hashed over this prefix and
/// flagged as truncated.
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Posture when the store rejects an append on the request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the persistence failure and let the request proceed
    #[default]
    FailOpen,
    /// Fail the in-flight request when its event cannot be persisted
    FailClosed,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            _ => Err(format!("Invalid failure policy: {}. Valid values: fail_open, fail_closed", s)),
        }
    }
}

/// Retention window for persisted events
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Number of days events must remain queryable
    pub days: u32,
}

impl RetentionPolicy {
    /// Create a policy with the given window
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// Compute the purge cutoff relative to now. Events with
    /// `timestamp < cutoff` are eligible for purge; everything at or
    /// after it is inside the window and must be kept.
    pub fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(i64::from(self.days))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { days: DEFAULT_RETENTION_DAYS }
    }
}

/// Process-wide audit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable/disable the whole subsystem
    pub enabled: bool,

    /// Retention window for the purge routine
    pub retention: RetentionPolicy,

    /// Capture raw request/response bodies in `details`.
    /// DEVELOPMENT ONLY: defeats the privacy guarantee of hash-only
    /// capture and must never be enabled in production.
    pub debug_capture: bool,

    /// Posture when an append fails on the request path
    pub failure_policy: FailurePolicy,

    /// Cap on body bytes hashed per direction
    pub max_capture_bytes: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention: RetentionPolicy::default(),
            debug_capture: false,
            failure_policy: FailurePolicy::default(),
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
        }
    }
}

impl AuditConfig {
    /// Load audit configuration from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("VIGIL_AUDIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let retention_days = std::env::var("VIGIL_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETENTION_DAYS);

        let debug_capture = std::env::var("VIGIL_AUDIT_DEBUG")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let failure_policy = std::env::var("VIGIL_FAILURE_POLICY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let max_capture_bytes = std::env::var("VIGIL_MAX_CAPTURE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES);

        Self {
            enabled,
            retention: RetentionPolicy::new(retention_days),
            debug_capture,
            failure_policy,
            max_capture_bytes,
        }
    }

    /// Validate configuration at startup. Failure here is fatal; the
    /// subsystem does not run partially configured.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retention.days == 0 {
            anyhow::bail!("Retention window must be at least one day");
        }

        if self.max_capture_bytes == 0 {
            anyhow::bail!("Max capture bytes must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert!(config.enabled);
        assert!(!config.debug_capture);
        assert_eq!(config.retention.days, DEFAULT_RETENTION_DAYS);
        assert_eq!(config.failure_policy, FailurePolicy::FailOpen);
        config.validate().unwrap();
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("fail_open".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailOpen);
        assert_eq!("fail_closed".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailClosed);
        assert_eq!("CLOSED".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailClosed);
        assert!("sideways".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_retention_cutoff_is_in_the_past() {
        let policy = RetentionPolicy::new(30);
        let cutoff = policy.cutoff();
        assert!(cutoff < Utc::now());
        assert!(cutoff > Utc::now() - Duration::days(31));
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let config = AuditConfig {
            retention: RetentionPolicy::new(0),
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capture() {
        let config = AuditConfig {
            max_capture_bytes: 0,
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
