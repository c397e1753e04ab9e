//! Configuration for the CLI.
//!
//! An optional TOML file supplies the vision endpoint, the output defaults and
//! an `[extractor]` table, in the same shape the server reads.

use crate::error::{CliError, Result};
use quorum_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vision model endpoint
    #[serde(default = "default_endpoint")]
    pub ollama_endpoint: String,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Voting pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Load configuration from `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ollama_endpoint.trim().is_empty() {
            return Err(CliError::Config("ollama_endpoint must not be empty".to_string()));
        }
        self.extractor.validate().map_err(CliError::Config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_endpoint: default_endpoint(),
            settings: Settings::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: default_true(),
            format: default_format(),
        }
    }
}

fn default_endpoint() -> String {
    quorum_llm::ollama::DEFAULT_ENDPOINT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.ollama_endpoint, "http://localhost:11434");
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quorum.toml");
        fs::write(
            &path,
            r#"
                ollama_endpoint = "http://gpu-box:11434"

                [settings]
                color = false
                format = "json"

                [extractor]
                primary_model = "llava:34b"
                secondary_model = "llava:13b"
                review_model = "llama3.2-vision:90b"
                run_timeout_secs = 30
                max_image_bytes = 1024
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.ollama_endpoint, "http://gpu-box:11434");
        assert!(!config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert_eq!(config.extractor.primary_model, "llava:34b");
        assert_eq!(config.extractor.run_timeout_secs, 30);
    }

    #[test]
    fn test_invalid_extractor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quorum.toml");
        fs::write(
            &path,
            r#"
                [extractor]
                primary_model = ""
                secondary_model = "b"
                review_model = "c"
                run_timeout_secs = 30
                max_image_bytes = 1024
            "#,
        )
        .unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/quorum.toml")));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
