//! Per-field vote outcomes and the overall voting result

use crate::{FieldVote, Record};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One distinct value and how many votes it received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    /// Serialized value
    pub value: String,
    /// Number of votes
    pub count: usize,
}

/// Vote counts per distinct value, in first-seen order
///
/// Order is part of the contract: among equal counts the earliest value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    entries: Vec<TallyEntry>,
}

impl VoteTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `value`
    pub fn record(&mut self, value: &str) {
        match self.entries.iter_mut().find(|e| e.value == value) {
            Some(entry) => entry.count += 1,
            None => self.entries.push(TallyEntry {
                value: value.to_string(),
                count: 1,
            }),
        }
    }

    /// Votes received by `value`
    pub fn count_of(&self, value: &str) -> usize {
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Highest-count value; ties go to the first-seen value
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::VoteTally;
    ///
    /// let mut tally = VoteTally::new();
    /// tally.record("B");
    /// tally.record("A");
    /// assert_eq!(tally.leader().unwrap().value, "B");
    /// tally.record("A");
    /// assert_eq!(tally.leader().unwrap().value, "A");
    /// ```
    pub fn leader(&self) -> Option<&TallyEntry> {
        let mut best: Option<&TallyEntry> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.count > b.count) {
                best = Some(entry);
            }
        }
        best
    }

    /// Total votes counted
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no votes were counted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &TallyEntry> {
        self.entries.iter()
    }
}

impl Serialize for VoteTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.value, &entry.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VoteTally {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TallyVisitor;

        impl<'de> Visitor<'de> for TallyVisitor {
            type Value = VoteTally;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of value to vote count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VoteTally, A::Error> {
                let mut entries = Vec::new();
                while let Some((value, count)) = access.next_entry::<String, usize>()? {
                    entries.push(TallyEntry { value, count });
                }
                Ok(VoteTally { entries })
            }
        }

        deserializer.deserialize_map(TallyVisitor)
    }
}

/// The voting outcome for one field path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDetail {
    /// Value placed in the canonical record
    pub winning_value: String,

    /// Count per distinct serialized value
    pub vote_tally: VoteTally,

    /// Winning count divided by total votes, in (0, 1]
    pub confidence: f64,

    /// Every observation for this field, in collection order
    pub all_votes: Vec<FieldVote>,
}

/// Business-level reasons a voting pass produced no canonical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingFailure {
    /// Zero runs succeeded
    AllRunsFailed,
    /// Runs succeeded but no field values were collected
    NoFieldsCollected,
}

impl VotingFailure {
    /// Human-readable message for callers
    pub fn message(&self) -> &'static str {
        match self {
            Self::AllRunsFailed => "all model runs failed",
            Self::NoFieldsCollected => "no fields were collected from successful runs",
        }
    }
}

impl fmt::Display for VotingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Top-level output of one voting pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingResult {
    /// Canonical record rebuilt from per-field winners
    pub final_result: Record,

    /// Outcome per field path
    pub vote_details: BTreeMap<String, VoteDetail>,

    /// Runs that produced a structured record
    #[serde(rename = "successful_models")]
    pub successful_run_count: usize,

    /// Runs in the manifest
    #[serde(rename = "total_models")]
    pub total_run_count: usize,

    /// Set when no canonical record could be produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VotingFailure>,
}

impl VotingResult {
    /// The explicit error shape: empty record and details plus a marker
    pub fn failed(failure: VotingFailure, successful_run_count: usize, total_run_count: usize) -> Self {
        Self {
            final_result: Record::new(),
            vote_details: BTreeMap::new(),
            successful_run_count,
            total_run_count,
            error: Some(failure),
        }
    }

    /// Whether a canonical record was produced
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Mean confidence across all fields; 0 when there are none
    pub fn average_confidence(&self) -> f64 {
        if self.vote_details.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.vote_details.values().map(|d| d.confidence).sum();
        sum / self.vote_details.len() as f64
    }
}
