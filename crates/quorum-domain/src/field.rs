//! Field paths and per-run field observations

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Address of one leaf position in a nested record (e.g. `patient_info.name`)
///
/// Segments are kept individually so a key that itself contains `.` is still
/// rebuilt at the right depth. The dotted form is what callers see.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Create a top-level path from a single key
    pub fn root(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    /// Extend this path by one key
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    /// Parse a dotted path
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum_domain::FieldPath;
    ///
    /// let path = FieldPath::parse("patient_info.name");
    /// assert_eq!(path.segments(), ["patient_info", "name"]);
    /// assert_eq!(path.to_string(), "patient_info.name");
    /// ```
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }

    /// The individual keys, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final key
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Number of nesting levels
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dotted = String::deserialize(deserializer)?;
        Ok(Self::parse(&dotted))
    }
}

/// One run's observed value for one field path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVote {
    /// Where the value was found
    pub field_path: FieldPath,

    /// Serialized value; lists are a single JSON string token
    #[serde(rename = "value")]
    pub serialized_value: String,

    /// Model that produced the value
    #[serde(rename = "model")]
    pub model_identity: String,

    /// Run index disambiguating repeated calls to the same model
    #[serde(rename = "run")]
    pub run_index: u32,
}

impl FieldVote {
    /// Create a new vote
    pub fn new(
        field_path: FieldPath,
        serialized_value: impl Into<String>,
        model_identity: impl Into<String>,
        run_index: u32,
    ) -> Self {
        Self {
            field_path,
            serialized_value: serialized_value.into(),
            model_identity: model_identity.into(),
            run_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_extends_path() {
        let path = FieldPath::root("patient_info").child("name");
        assert_eq!(path.to_string(), "patient_info.name");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.leaf(), "name");
    }

    #[test]
    fn test_dotted_key_kept_as_one_segment() {
        let path = FieldPath::root("dose").child("5.0mg");
        assert_eq!(path.segments(), ["dose", "5.0mg"]);
        assert_eq!(path.to_string(), "dose.5.0mg");
    }

    #[test]
    fn test_serializes_as_dotted_string() {
        let vote = FieldVote::new(FieldPath::parse("a.b"), "x", "model-a", 2);
        let json = serde_json::to_value(&vote).unwrap();
        assert_eq!(json["field_path"], "a.b");
        assert_eq!(json["value"], "x");
        assert_eq!(json["model"], "model-a");
        assert_eq!(json["run"], 2);
    }
}
