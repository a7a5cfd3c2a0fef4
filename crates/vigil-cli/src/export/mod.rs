//! Signed CSV export bundles
//!
//! A bundle is three files sharing a base name: the CSV itself, a
//! detached hex-encoded HMAC signature, and a JSON metadata sidecar.

pub mod bundle;
pub mod writer;

pub use bundle::{seal_bundle, verify_bundle, ExportMetadata, VerifyReport, SIGNATURE_ALGORITHM};
pub use writer::{write_events_csv, CSV_COLUMNS};
