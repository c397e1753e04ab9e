//! Aggregate report over one processing request

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Success counts for one model identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPerformance {
    /// Runs of this model that succeeded
    pub success: usize,
    /// Runs of this model in the manifest
    pub total: usize,
}

/// Statistics derived from the runs and the voting result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Runs in the manifest
    pub total_runs: usize,

    /// Runs that produced a structured record
    pub successful_runs: usize,

    /// successful / total, 0 when total is 0
    pub success_rate: f64,

    /// Per-model breakdown, ignoring run index
    pub model_performance: BTreeMap<String, ModelPerformance>,

    /// Mean confidence across all voted fields
    pub average_confidence: f64,

    /// Fields with confidence >= 0.75
    pub high_confidence_fields: Vec<String>,

    /// Fields with confidence < 0.5
    pub low_confidence_fields: Vec<String>,
}
