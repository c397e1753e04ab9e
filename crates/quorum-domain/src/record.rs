//! Record module - canonical records as handed to the record store

use crate::Record;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Unique identifier for a stored record based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u128);

impl RecordId {
    /// Generate a new UUIDv7-based RecordId
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::RecordId;
    ///
    /// let id = RecordId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a RecordId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a RecordId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::RecordId;
    ///
    /// let id = RecordId::new();
    /// let parsed = RecordId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid record id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// How a stored record was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Fully machine-decided by multi-run voting
    Automatic,
    /// A person confirmed or edited the fields
    HumanReview,
}

impl ProcessingMode {
    /// Storage/wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::HumanReview => "human_review",
        }
    }

    /// Parse the storage/wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "automatic" => Some(Self::Automatic),
            "human_review" => Some(Self::HumanReview),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confidence value kept as exact decimal text
///
/// Built from the shortest decimal string that round-trips the `f64`, so the
/// stored digits are exactly the digits the voting engine produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExactDecimal(String);

impl ExactDecimal {
    /// Convert a finite float; `None` for NaN or infinity
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::ExactDecimal;
    ///
    /// assert_eq!(ExactDecimal::from_f64(2.0 / 3.0).unwrap().as_str(), "0.6666666666666666");
    /// assert_eq!(ExactDecimal::from_f64(1.0).unwrap().as_str(), "1.0");
    /// ```
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        Some(Self(text))
    }

    /// Parse decimal text read back from storage
    pub fn parse(text: &str) -> Option<Self> {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|_| Self(text.to_string()))
    }

    /// Full confidence, used for human-reviewed records
    pub fn one() -> Self {
        Self("1.0".to_string())
    }

    /// The decimal text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nearest float value
    pub fn as_f64(&self) -> f64 {
        self.0.parse().unwrap_or(0.0)
    }
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A canonical record as persisted, with provenance metadata
///
/// Records are inserted once; the only in-place change is a review update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Unique identifier
    pub id: RecordId,

    /// Processing session the record came from
    pub session_id: String,

    /// How the record was decided
    pub processing_mode: ProcessingMode,

    /// Whether a person confirmed the fields
    pub human_reviewed: bool,

    /// The canonical nested record
    pub data: Record,

    /// Mean vote confidence, or 1.0 after human review
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<ExactDecimal>,

    /// RFC 3339 creation timestamp
    pub created_at: String,

    /// RFC 3339 timestamp of the last update
    pub updated_at: String,
}

impl StoredRecord {
    /// Create a new record stamped with the current time
    pub fn new(
        session_id: impl Into<String>,
        processing_mode: ProcessingMode,
        data: Record,
        confidence_score: Option<ExactDecimal>,
    ) -> Self {
        let now = now_rfc3339();
        Self {
            id: RecordId::new(),
            session_id: session_id.into(),
            processing_mode,
            human_reviewed: processing_mode == ProcessingMode::HumanReview,
            data,
            confidence_score,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Apply a partial update in place, refreshing `updated_at`
    pub fn apply(&mut self, update: RecordUpdate) {
        if let Some(data) = update.data {
            self.data = data;
        }
        if let Some(reviewed) = update.human_reviewed {
            self.human_reviewed = reviewed;
        }
        if let Some(mode) = update.processing_mode {
            self.processing_mode = mode;
        }
        if let Some(confidence) = update.confidence_score {
            self.confidence_score = Some(confidence);
        }
        self.updated_at = now_rfc3339();
    }

    /// The record as a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Partial update for a stored record; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// Replacement canonical data
    #[serde(default)]
    pub data: Option<Record>,

    /// New review flag
    #[serde(default)]
    pub human_reviewed: Option<bool>,

    /// New processing mode
    #[serde(default)]
    pub processing_mode: Option<ProcessingMode>,

    /// New confidence score
    #[serde(default)]
    pub confidence_score: Option<ExactDecimal>,
}

impl RecordUpdate {
    /// The update applied when a person marks a record reviewed
    pub fn mark_reviewed(data: Option<Record>) -> Self {
        Self {
            data,
            human_reviewed: Some(true),
            processing_mode: Some(ProcessingMode::HumanReview),
            confidence_score: Some(ExactDecimal::one()),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
