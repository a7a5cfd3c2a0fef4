//! Vigil CLI
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Export and verification tool for the audit store. Exports a time
//! window of events as a signed CSV bundle, and verifies previously
//! exported bundles offline against nothing but the bundle files and
//! the signing key.

pub mod commands;
pub mod error;
pub mod export;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface for the audit export tool
#[derive(Parser)]
#[command(name = "vigil", version, about = "Tamper-evident audit trail export and verification")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the audit database
    #[arg(
        long,
        global = true,
        env = "VIGIL_DB_PATH",
        default_value = "./audit/audit.db"
    )]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Export audit events to a signed CSV bundle
    ///
    /// Writes the CSV, a detached hex signature (`<output>.sig`), and
    /// a metadata sidecar (`<output>.meta.json`).
    Export {
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Export events from the last N days
        #[arg(long, default_value_t = 30, conflicts_with_all = ["from", "to"])]
        days: u32,

        /// Window start (RFC3339 timestamp)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Window end (RFC3339 timestamp)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Verify a previously exported bundle
    ///
    /// Checks the content digest and HMAC signature. Never consults
    /// the audit store; verification works from the bundle alone.
    Verify {
        /// Path to the exported CSV
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List recent audit events
    List {
        /// Maximum number of events to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Filter by event type (e.g. query_sql, data_upload)
        #[arg(long)]
        event_type: Option<String>,

        /// Filter by caller identity
        #[arg(long)]
        user: Option<String>,
    },

    /// Delete events older than the retention window
    Purge {
        /// Retention window in days
        #[arg(long)]
        retention_days: u32,
    },
}
