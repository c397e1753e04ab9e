//! Quorum Vision Provider Layer
//!
//! Pluggable vision-model provider implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `VisionProvider` trait from
//! `quorum-domain`. Every provider takes an image, a prompt and a model
//! identity, and returns the model's free-form text.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted responses for testing
//! - `OllamaProvider`: Ollama-compatible HTTP vision API
//!
//! # Examples
//!
//! ```
//! use quorum_llm::MockProvider;
//! use quorum_domain::traits::VisionProvider;
//!
//! let provider = MockProvider::new(r#"{"name": "Alice"}"#);
//! let text = provider.extract(b"png bytes", "prompt", "any-model").unwrap();
//! assert_eq!(text, r#"{"name": "Alice"}"#);
//! ```

#![warn(missing_docs)]

pub mod ollama;

use quorum_domain::traits::VisionProvider;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during vision model calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model endpoint
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    fixed: HashMap<String, Scripted>,
    queued: HashMap<String, VecDeque<Scripted>>,
    calls: Vec<String>,
}

/// Mock vision provider for deterministic testing
///
/// Responses are chosen per model identity: a queued response is used first
/// (one per call, in order), then a fixed per-model response, then the default.
///
/// # Examples
///
/// ```
/// use quorum_llm::MockProvider;
/// use quorum_domain::traits::VisionProvider;
///
/// let mut provider = MockProvider::default();
/// provider.queue_response("sonnet", "first");
/// provider.queue_response("sonnet", "second");
/// provider.add_error("haiku", "throttled");
///
/// assert_eq!(provider.extract(b"", "p", "sonnet").unwrap(), "first");
/// assert_eq!(provider.extract(b"", "p", "sonnet").unwrap(), "second");
/// assert!(provider.extract(b"", "p", "haiku").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all models
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Always answer `model` with `response`
    pub fn add_response(&mut self, model: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .fixed
            .insert(model.into(), Scripted::Text(response.into()));
    }

    /// Always fail calls to `model`
    pub fn add_error(&mut self, model: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .fixed
            .insert(model.into(), Scripted::Error(message.into()));
    }

    /// Answer the next unanswered call to `model` with `response`
    pub fn queue_response(&mut self, model: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .queued
            .entry(model.into())
            .or_default()
            .push_back(Scripted::Text(response.into()));
    }

    /// Fail the next unanswered call to `model`
    pub fn queue_error(&mut self, model: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .queued
            .entry(model.into())
            .or_default()
            .push_back(Scripted::Error(message.into()));
    }

    /// Get the number of times extract was called
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Models called so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Reset the call log
    pub fn reset_call_count(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl VisionProvider for MockProvider {
    type Error = LlmError;

    fn extract(&self, _image: &[u8], _prompt: &str, model_identity: &str) -> Result<String, Self::Error> {
        let mut state = self.lock();
        state.calls.push(model_identity.to_string());

        let queued = state
            .queued
            .get_mut(model_identity)
            .and_then(VecDeque::pop_front);
        let scripted = match queued {
            Some(next) => Some(next),
            None => state.fixed.get(model_identity).cloned(),
        };

        match scripted {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Error(message)) => Err(LlmError::Other(message)),
            None => Ok(self.default_response.clone()),
        }
    }
}
