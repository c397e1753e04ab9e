//! Error types for the extraction pipeline
//!
//! Per-run failures and empty voting outcomes are values, not errors; these
//! variants cover requests that cannot be started at all.

use thiserror::Error;

/// Errors that stop a processing request before any run is issued
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Document has no bytes
    #[error("Document is empty")]
    EmptyImage,

    /// Document exceeds the configured size limit
    #[error("Document too large: {0} bytes (max: {1})")]
    ImageTooLarge(usize, usize),

    /// Manifest has no entries
    #[error("Manifest has no runs")]
    EmptyManifest,
}
