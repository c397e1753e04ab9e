//! Ollama Provider Implementation
//!
//! Provides integration with Ollama-compatible vision model APIs.
//!
//! # Features
//!
//! - Async HTTP communication with the `/api/generate` endpoint
//! - Images sent base64-encoded alongside the prompt
//! - Model chosen per call, so one provider serves a whole manifest
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use quorum_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434")
//!     .with_temperature(0.5)
//!     .with_max_tokens(2000);
//!
//! // `extract` via the VisionProvider trait blocks; call it from a blocking
//! // context, or use the async `generate` directly.
//! ```

use crate::LlmError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quorum_domain::traits::VisionProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for a single HTTP request (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Ollama API provider for vision extraction
pub struct OllamaProvider {
    endpoint: String,
    client: reqwest::Client,
    max_retries: u32,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: GenerateOptions,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a provider against `http://localhost:11434`
    pub fn default_endpoint() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }

    /// Set the maximum number of attempts per call
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the cap on generated tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send an image and prompt to `model` and return the generated text
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The endpoint is unreachable
    /// - The model is not available
    /// - Every attempt fails
    /// - The response body is malformed
    pub async fn generate(&self, image: &[u8], prompt: &str, model: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model,
            prompt,
            images: vec![BASE64.encode(image)],
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            debug!("Calling {} (attempt {})", model, attempts + 1);
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<OllamaGenerateResponse>()
                            .await
                            .map(|r| r.response)
                            .map_err(|e| {
                                LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                            });
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(model.to_string()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!("{} call failed, retrying in {:?}", model, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl VisionProvider for OllamaProvider {
    type Error = LlmError;

    /// Blocking wrapper around [`OllamaProvider::generate`]
    ///
    /// Reuses the ambient runtime when called from a blocking-pool thread,
    /// otherwise spins up a private one. Must not be called from inside an
    /// async task.
    fn extract(&self, image: &[u8], prompt: &str, model_identity: &str) -> Result<String, Self::Error> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.generate(image, prompt, model_identity)),
            Err(_) => tokio::runtime::Runtime::new()
                .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?
                .block_on(self.generate(image, prompt, model_identity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434");
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(provider.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_ollama_provider_builders() {
        let provider = OllamaProvider::new("http://localhost:11434")
            .with_max_retries(0)
            .with_temperature(0.1)
            .with_max_tokens(512);
        // At least one attempt is always made
        assert_eq!(provider.max_retries, 1);
        assert_eq!(provider.temperature, 0.1);
        assert_eq!(provider.max_tokens, 512);
    }

    #[test]
    fn test_request_body_carries_base64_image() {
        let body = OllamaGenerateRequest {
            model: "llava",
            prompt: "read this",
            images: vec![BASE64.encode(b"abc")],
            stream: false,
            options: GenerateOptions {
                temperature: 0.5,
                num_predict: 10,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["images"][0], "YWJj");
        assert_eq!(json["options"]["num_predict"], 10);
        assert_eq!(json["stream"], false);
    }

    // Integration tests (requires running Ollama with a vision model)
    #[tokio::test]
    #[ignore]
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::default_endpoint();
        let result = provider.generate(b"", "Say 'hello' and nothing else", "llava").await;
        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Use an unroutable endpoint to trigger error
        let provider = OllamaProvider::new("http://localhost:99999").with_max_retries(1);

        let result = provider.generate(b"img", "test", "llava").await;
        match result {
            Err(LlmError::Communication(_)) => {}
            other => panic!("Expected Communication error, got {:?}", other.map(|_| ())),
        }
    }
}
