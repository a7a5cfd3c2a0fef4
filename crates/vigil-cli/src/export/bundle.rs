//! Bundle sealing and verification
//!
//! Sealing hashes the CSV bytes, signs them with the provisioned key,
//! and writes the signature and metadata sidecars. Verification is
//! the inverse and works offline: only the bundle files and the key
//! are consulted, never the store.

use crate::error::{CliError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vigil_common::digest::{macs_equal, sha256_file, sign_hmac_file};
use vigil_common::AuditError;

/// Algorithm identifier written to the metadata sidecar
pub const SIGNATURE_ALGORITHM: &str = "HMAC-SHA256";

/// Metadata sidecar (`<output>.meta.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// When the export was produced
    pub export_timestamp: DateTime<Utc>,

    /// Window start
    pub start_date: DateTime<Utc>,

    /// Window end
    pub end_date: DateTime<Utc>,

    /// Number of event rows in the CSV
    pub record_count: u64,

    /// SHA-256 hex digest of the CSV bytes
    pub content_hash: String,

    /// Signature algorithm identifier
    pub signature_algorithm: String,
}

/// Path of the detached signature for a CSV
pub fn sig_path(csv_path: &Path) -> PathBuf {
    with_suffix(csv_path, ".sig")
}

/// Path of the metadata sidecar for a CSV
pub fn meta_path(csv_path: &Path) -> PathBuf {
    with_suffix(csv_path, ".meta.json")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Seal an exported CSV: write `<csv>.sig` and `<csv>.meta.json`
pub fn seal_bundle(
    csv_path: &Path,
    key: &[u8],
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    record_count: u64,
) -> Result<ExportMetadata> {
    let content_hash = sha256_file(csv_path)?;
    let signature = sign_hmac_file(key, csv_path)?;

    std::fs::write(sig_path(csv_path), &signature)?;

    let metadata = ExportMetadata {
        export_timestamp: Utc::now(),
        start_date,
        end_date,
        record_count,
        content_hash,
        signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
    };
    std::fs::write(meta_path(csv_path), serde_json::to_string_pretty(&metadata)?)?;

    Ok(metadata)
}

/// Outcome of verifying a bundle
#[derive(Debug)]
pub struct VerifyReport {
    /// CSV digest matches the metadata content hash
    pub hash_valid: bool,

    /// Recomputed MAC matches the detached signature
    pub signature_valid: bool,

    /// Record count claimed by the metadata
    pub record_count: u64,
}

impl VerifyReport {
    /// Whether the bundle passed every check
    pub fn passed(&self) -> bool {
        self.hash_valid && self.signature_valid
    }

    /// Convert a failed check into an integrity error
    ///
    /// The hash verdict comes first: a modified CSV invalidates the
    /// signature too, and the more specific finding should win.
    pub fn ensure_passed(&self) -> vigil_common::Result<()> {
        if !self.hash_valid {
            return Err(AuditError::integrity("content modified"));
        }
        if !self.signature_valid {
            return Err(AuditError::integrity("signature invalid"));
        }
        Ok(())
    }
}

/// Verify a bundle against the signing key
///
/// Missing bundle files are errors; check failures are reported in
/// the returned [`VerifyReport`] so the caller can name what failed.
pub fn verify_bundle(csv_path: &Path, key: &[u8]) -> Result<VerifyReport> {
    if !csv_path.exists() {
        return Err(CliError::file_not_found(csv_path.display().to_string()));
    }

    let sig_path = sig_path(csv_path);
    if !sig_path.exists() {
        return Err(CliError::file_not_found(sig_path.display().to_string()));
    }

    let meta_path = meta_path(csv_path);
    if !meta_path.exists() {
        return Err(CliError::file_not_found(meta_path.display().to_string()));
    }

    let metadata: ExportMetadata = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?;
    let stored_signature = std::fs::read_to_string(&sig_path)?;

    let actual_hash = sha256_file(csv_path)?;
    let hash_valid = actual_hash == metadata.content_hash;

    let expected_signature = sign_hmac_file(key, csv_path)?;
    let signature_valid = macs_equal(&expected_signature, stored_signature.trim());

    Ok(VerifyReport { hash_valid, signature_valid, record_count: metadata.record_count })
}
