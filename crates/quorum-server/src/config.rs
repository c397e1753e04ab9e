//! Configuration file parsing for the intake server.
//!
//! Loads settings from TOML files including bind address, storage locations,
//! the vision endpoint, and an `[extractor]` table for the voting pipeline.

use quorum_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 5006)
    pub bind_port: u16,

    /// SQLite database file for canonical records
    pub database_path: String,

    /// Directory that holds uploads and processing archives
    pub blob_root: String,

    /// Vision model endpoint
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,

    /// Largest accepted upload (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Voting pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

fn default_ollama_endpoint() -> String {
    quorum_llm::ollama::DEFAULT_ENDPOINT.to_string()
}

/// Default upload limit: 16 MiB
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that TOML parsing alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        if self.blob_root.trim().is_empty() {
            return Err(ConfigError::Invalid("blob_root must not be empty".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        self.extractor.validate().map_err(ConfigError::Invalid)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 5006,
            database_path: ":memory:".to_string(),
            blob_root: "quorum-blobs".to_string(),
            ollama_endpoint: default_ollama_endpoint(),
            max_upload_bytes: default_max_upload_bytes(),
            extractor: ExtractorConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
