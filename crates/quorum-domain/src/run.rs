//! Extraction runs and the manifests that schedule them

use crate::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One scheduled (model, run index) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRun {
    /// Opaque model identifier passed to the vision endpoint
    pub model_identity: String,

    /// 1-based index disambiguating repeated calls to the same model
    pub run_index: u32,
}

impl ModelRun {
    /// Create a new manifest entry
    pub fn new(model_identity: impl Into<String>, run_index: u32) -> Self {
        Self {
            model_identity: model_identity.into(),
            run_index,
        }
    }
}

impl fmt::Display for ModelRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (run {})", self.model_identity, self.run_index)
    }
}

/// Ordered list of runs to execute against one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    runs: Vec<ModelRun>,
}

impl Manifest {
    /// Create a manifest from explicit entries
    pub fn new(runs: Vec<ModelRun>) -> Self {
        Self { runs }
    }

    /// Two models, each run twice (4 runs)
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::Manifest;
    ///
    /// let manifest = Manifest::broad("sonnet", "haiku");
    /// assert_eq!(manifest.len(), 4);
    /// assert_eq!(manifest.runs()[1].run_index, 2);
    /// ```
    pub fn broad(primary: &str, secondary: &str) -> Self {
        Self::new(vec![
            ModelRun::new(primary, 1),
            ModelRun::new(primary, 2),
            ModelRun::new(secondary, 1),
            ModelRun::new(secondary, 2),
        ])
    }

    /// Three distinct models, each run once (3 runs)
    pub fn enhanced(primary: &str, secondary: &str, latest: &str) -> Self {
        Self::new(vec![
            ModelRun::new(primary, 1),
            ModelRun::new(secondary, 1),
            ModelRun::new(latest, 1),
        ])
    }

    /// The entries in execution order
    pub fn runs(&self) -> &[ModelRun] {
        &self.runs
    }

    /// Iterate over entries in execution order
    pub fn iter(&self) -> impl Iterator<Item = &ModelRun> {
        self.runs.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Outcome of a single extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model returned text that parsed into a structured record
    Succeeded {
        /// The parsed nested record
        structured_record: Record,
    },
    /// The call raised, timed out, or returned unparseable text
    Failed {
        /// Human-readable failure reason
        error_detail: String,
    },
}

/// One invocation of the extraction capability
///
/// Immutable once the call returns; lives for one processing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRun {
    /// Model that was called
    pub model_identity: String,

    /// Run index within the manifest
    pub run_index: u32,

    /// Raw model text; empty when the call failed before returning any
    pub raw_text: String,

    /// Wall-clock duration of the call in milliseconds
    pub elapsed_ms: u64,

    /// Success or failure detail
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl ExtractionRun {
    /// Record a successful run
    pub fn success(
        run: &ModelRun,
        raw_text: impl Into<String>,
        structured_record: Record,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            model_identity: run.model_identity.clone(),
            run_index: run.run_index,
            raw_text: raw_text.into(),
            elapsed_ms,
            outcome: RunOutcome::Succeeded { structured_record },
        }
    }

    /// Record a failed run
    pub fn failure(
        run: &ModelRun,
        raw_text: impl Into<String>,
        error_detail: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            model_identity: run.model_identity.clone(),
            run_index: run.run_index,
            raw_text: raw_text.into(),
            elapsed_ms,
            outcome: RunOutcome::Failed {
                error_detail: error_detail.into(),
            },
        }
    }

    /// Whether the run produced a structured record
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Succeeded { .. })
    }

    /// The structured record, present iff the run succeeded
    pub fn structured_record(&self) -> Option<&Record> {
        match &self.outcome {
            RunOutcome::Succeeded { structured_record } => Some(structured_record),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// The failure reason, present iff the run failed
    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Succeeded { .. } => None,
            RunOutcome::Failed { error_detail } => Some(error_detail),
        }
    }

    /// The manifest entry this run executed
    pub fn model_run(&self) -> ModelRun {
        ModelRun::new(self.model_identity.clone(), self.run_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enhanced_manifest() {
        let manifest = Manifest::enhanced("a", "b", "c");
        let models: Vec<_> = manifest.iter().map(|r| r.model_identity.as_str()).collect();
        assert_eq!(models, ["a", "b", "c"]);
        assert!(manifest.iter().all(|r| r.run_index == 1));
    }

    #[test]
    fn test_success_run_accessors() {
        let record = json!({"name": "Alice"}).as_object().unwrap().clone();
        let run = ExtractionRun::success(&ModelRun::new("m", 1), "{}", record, 12);
        assert!(run.succeeded());
        assert!(run.structured_record().is_some());
        assert!(run.error_detail().is_none());
    }

    #[test]
    fn test_failure_run_serializes_flat() {
        let run = ExtractionRun::failure(&ModelRun::new("m", 2), "", "timeout", 5);
        assert!(!run.succeeded());
        assert_eq!(run.error_detail(), Some("timeout"));

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_detail"], "timeout");
        assert_eq!(value["run_index"], 2);
        assert!(value.get("structured_record").is_none());
    }
}
