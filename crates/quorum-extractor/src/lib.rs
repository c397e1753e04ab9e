//! Quorum Extractor
//!
//! Sends one document to several vision model runs and reconciles their
//! structured outputs with field-level plurality voting.
//!
//! # Architecture
//!
//! ```text
//! image → Orchestrator → VisionProvider (× manifest) → Parser → Flattener
//!       → Voting → canonical record + vote details → Summary
//! ```
//!
//! # Key Features
//!
//! - **Tolerant parsing**: JSON is recovered from markdown fences or prose
//! - **Partial failure**: a failed run is recorded, never fatal to the batch
//! - **Deterministic voting**: ties go to the first-seen value
//! - **Lists vote as units**: order-sensitive or canonical, by configuration
//! - **Sequential or concurrent** dispatch with a per-run timeout
//!
//! # Example Usage
//!
//! ```no_run
//! use quorum_extractor::{ExtractorConfig, Orchestrator, SchemaPrompt};
//! use quorum_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MockProvider::new(r#"{"patient_info": {"name": "Alice"}}"#);
//! let config = ExtractorConfig::default();
//! let manifest = config.broad_manifest();
//!
//! let orchestrator = Orchestrator::new(provider, config, SchemaPrompt::medical_certificate());
//! let outcome = orchestrator.process(b"image bytes", &manifest).await?;
//!
//! println!("{}", serde_json::to_string_pretty(&outcome.voting_result.final_result)?);
//! println!("Average confidence: {:.2}", outcome.summary.average_confidence);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod types;

pub mod flatten;
pub mod parser;
pub mod prompt;
pub mod summary;
pub mod voting;


pub use config::{ExtractorConfig, ListVotePolicy};
pub use error::ExtractorError;
pub use flatten::flatten_record;
pub use orchestrator::Orchestrator;
pub use parser::{parse_extraction, ParsedExtraction};
pub use prompt::{PromptPurpose, SchemaPrompt};
pub use summary::summarize;
pub use types::ProcessingOutcome;
pub use voting::{vote, vote_for_field, vote_on_runs};
