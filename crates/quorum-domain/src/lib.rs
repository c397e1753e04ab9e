//! Quorum Domain Layer
//!
//! This crate contains the data model shared by every other Quorum crate and
//! the trait interfaces for the external collaborators the core consumes.
//!
//! ## Key Concepts
//!
//! - **Field path**: Dotted address of one leaf position in a nested record
//! - **Vote**: One run's contributed value for one field path
//! - **Extraction run**: One (model, run index) invocation of a vision endpoint
//! - **Voting result**: The canonical record rebuilt from per-field winners
//! - **Stored record**: A canonical record as persisted, with provenance
//!
//! ## Architecture
//!
//! - Records are `serde_json::Value` trees (insertion-ordered maps)
//! - No I/O; infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod record;
pub mod run;
pub mod summary;
pub mod traits;
pub mod vote;

// Re-exports for convenience
pub use field::{FieldPath, FieldVote};
pub use record::{ExactDecimal, ProcessingMode, RecordId, RecordUpdate, StoredRecord};
pub use run::{ExtractionRun, Manifest, ModelRun, RunOutcome};
pub use summary::{ModelPerformance, RunSummary};
pub use vote::{TallyEntry, VoteDetail, VoteTally, VotingFailure, VotingResult};

/// A nested structured record as returned by a model or rebuilt by voting.
pub type Record = serde_json::Map<String, serde_json::Value>;
