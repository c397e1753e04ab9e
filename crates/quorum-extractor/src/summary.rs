//! Aggregate statistics over one processing request

use quorum_domain::{ExtractionRun, ModelPerformance, RunSummary, VotingResult};
use std::collections::BTreeMap;

/// Fields at or above this confidence are reported as high confidence
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Fields below this confidence are reported as low confidence
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Summarize the runs of one request and the vote they produced
pub fn summarize(runs: &[ExtractionRun], voting: &VotingResult) -> RunSummary {
    let total_runs = runs.len();
    let successful_runs = runs.iter().filter(|r| r.succeeded()).count();
    let success_rate = if total_runs == 0 {
        0.0
    } else {
        successful_runs as f64 / total_runs as f64
    };

    let mut model_performance: BTreeMap<String, ModelPerformance> = BTreeMap::new();
    for run in runs {
        let entry = model_performance.entry(run.model_identity.clone()).or_default();
        entry.total += 1;
        if run.succeeded() {
            entry.success += 1;
        }
    }

    let high_confidence_fields = voting
        .vote_details
        .iter()
        .filter(|(_, d)| d.confidence >= HIGH_CONFIDENCE_THRESHOLD)
        .map(|(path, _)| path.clone())
        .collect();
    let low_confidence_fields = voting
        .vote_details
        .iter()
        .filter(|(_, d)| d.confidence < LOW_CONFIDENCE_THRESHOLD)
        .map(|(path, _)| path.clone())
        .collect();

    RunSummary {
        total_runs,
        successful_runs,
        success_rate,
        model_performance,
        average_confidence: voting.average_confidence(),
        high_confidence_fields,
        low_confidence_fields,
    }
}
