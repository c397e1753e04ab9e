//! Output of one processing request

use quorum_domain::{ExtractionRun, RunSummary, VotingResult};
use serde::{Deserialize, Serialize};

/// Everything one manifest produced for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    /// One entry per manifest run, in manifest order
    pub individual_results: Vec<ExtractionRun>,

    /// Canonical record and per-field detail
    pub voting_result: VotingResult,

    /// Aggregate statistics
    pub summary: RunSummary,
}

impl ProcessingOutcome {
    /// Whether voting produced a canonical record
    pub fn is_success(&self) -> bool {
        self.voting_result.is_success()
    }
}
