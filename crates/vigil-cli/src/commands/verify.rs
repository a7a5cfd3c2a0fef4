//! `vigil verify` command implementation

use crate::error::Result;
use crate::export::verify_bundle;
use colored::Colorize;
use std::path::PathBuf;
use vigil_common::keys::{EnvKeyProvider, SigningKeyProvider};

/// Verify a previously exported bundle
///
/// Prints a human-readable verdict; a failed check surfaces as an
/// integrity error (exit code 1).
pub async fn run(file: PathBuf) -> Result<()> {
    let key = EnvKeyProvider::new().signing_key()?;
    let report = verify_bundle(&file, &key)?;

    if !report.hash_valid {
        println!(
            "{} Verification failed: content modified (digest does not match metadata)",
            "✗".red()
        );
    } else if !report.signature_valid {
        println!(
            "{} Verification failed: signature invalid (wrong key or tampered signature file)",
            "✗".red()
        );
    } else {
        println!(
            "{} Verification passed: {} records, content and signature intact",
            "✓".green(),
            report.record_count
        );
    }

    report.ensure_passed()?;
    Ok(())
}
