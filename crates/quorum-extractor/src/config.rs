//! Configuration for the multi-run orchestrator

use quorum_domain::Manifest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How list values are turned into a single vote token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListVotePolicy {
    /// Serialize the list as returned; `["A","B"]` and `["B","A"]` differ
    #[default]
    OrderSensitive,
    /// Sort elements by their JSON text first; element order is ignored
    Canonical,
}

/// Configuration for the Orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Strongest of the two voting models
    pub primary_model: String,

    /// Second voting model
    pub secondary_model: String,

    /// Highest-capability model, used in the enhanced manifest and for review
    pub review_model: String,

    /// Maximum time for a single run (seconds)
    pub run_timeout_secs: u64,

    /// Maximum document size (bytes)
    pub max_image_bytes: usize,

    /// Sampling temperature passed to the vision provider
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Cap on generated tokens per run
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Dispatch every run before awaiting any
    #[serde(default)]
    pub concurrent_runs: bool,

    /// List voting policy
    #[serde(default)]
    pub list_policy: ListVotePolicy,
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    2000
}

impl ExtractorConfig {
    /// Get the per-run timeout as a Duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Two models, each run twice
    pub fn broad_manifest(&self) -> Manifest {
        Manifest::broad(&self.primary_model, &self.secondary_model)
    }

    /// Three distinct models, each run once
    pub fn enhanced_manifest(&self) -> Manifest {
        Manifest::enhanced(&self.primary_model, &self.secondary_model, &self.review_model)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, model) in [
            ("primary_model", &self.primary_model),
            ("secondary_model", &self.secondary_model),
            ("review_model", &self.review_model),
        ] {
            if model.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        if self.run_timeout_secs == 0 {
            return Err("run_timeout_secs must be greater than 0".to_string());
        }
        if self.max_image_bytes == 0 {
            return Err("max_image_bytes must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("temperature {} out of range [0.0, 2.0]", self.temperature));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Sequential runs against local vision models
    fn default() -> Self {
        Self {
            primary_model: "llava:13b".to_string(),
            secondary_model: "llava:7b".to_string(),
            review_model: "llama3.2-vision:11b".to_string(),
            run_timeout_secs: 120,
            max_image_bytes: 16 * 1024 * 1024,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            concurrent_runs: false,
            list_policy: ListVotePolicy::OrderSensitive,
        }
    }
}

impl ExtractorConfig {
    /// Fast preset: concurrent dispatch with a shorter per-run timeout
    pub fn fast() -> Self {
        Self {
            run_timeout_secs: 60,
            concurrent_runs: true,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fast_config_is_valid() {
        let config = ExtractorConfig::fast();
        assert!(config.validate().is_ok());
        assert!(config.concurrent_runs);
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = ExtractorConfig::default();
        config.run_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = ExtractorConfig::default();
        config.review_model = "  ".to_string();
        assert!(config.validate().unwrap_err().contains("review_model"));
    }

    #[test]
    fn test_manifests_follow_models() {
        let config = ExtractorConfig::default();
        let broad = config.broad_manifest();
        assert_eq!(broad.len(), 4);
        assert_eq!(broad.runs()[0].model_identity, config.primary_model);
        assert_eq!(broad.runs()[3].model_identity, config.secondary_model);

        let enhanced = config.enhanced_manifest();
        assert_eq!(enhanced.len(), 3);
        assert_eq!(enhanced.runs()[2].model_identity, config.review_model);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = ExtractorConfig::default();
        config.list_policy = ListVotePolicy::Canonical;
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.primary_model, parsed.primary_model);
        assert_eq!(config.run_timeout_secs, parsed.run_timeout_secs);
        assert_eq!(parsed.list_policy, ListVotePolicy::Canonical);
    }

    #[test]
    fn test_toml_defaults_optional_fields() {
        let toml_str = r#"
            primary_model = "a"
            secondary_model = "b"
            review_model = "c"
            run_timeout_secs = 30
            max_image_bytes = 1024
        "#;
        let config = ExtractorConfig::from_toml(toml_str).unwrap();
        assert!(!config.concurrent_runs);
        assert_eq!(config.list_policy, ListVotePolicy::OrderSensitive);
        assert_eq!(config.max_tokens, 2000);
    }
}
