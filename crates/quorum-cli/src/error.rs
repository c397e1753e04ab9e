//! Error types for the CLI application.

use quorum_domain::VotingFailure;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Orchestrator rejected the request
    #[error("Extraction error: {0}")]
    Extraction(#[from] quorum_extractor::ExtractorError),

    /// Record store error
    #[error("Store error: {0}")]
    Store(#[from] quorum_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Voting produced no canonical record
    #[error("Voting failed: {0}")]
    VotingFailed(VotingFailure),
}
