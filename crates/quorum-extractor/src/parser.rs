//! Parse raw model output into a structured value
//!
//! Models often wrap JSON in markdown fences or surround it with prose. The
//! parser tries, in order: the whole text, the first fenced block, then the
//! span from the first `{` to the last `}`. Failure is a value, never an error.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// Marker used when no candidate JSON span was found
pub const NO_JSON_FOUND: &str = "no JSON content found";

/// Marker used when every candidate span failed to decode
pub const JSON_DECODE_FAILED: &str = "JSON decode failed";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("fenced block pattern is valid")
});

// Greedy on purpose: first `{` to last `}`. Prose containing braces after the
// object defeats it.
static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"));

/// Best-effort parse of model output
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExtraction {
    /// Some step decoded to JSON
    Structured(Value),
    /// Nothing decoded
    Degraded {
        /// The original model output
        raw_text: String,
        /// Which way parsing failed
        parsing_error: &'static str,
    },
}

impl ParsedExtraction {
    /// Whether a JSON value was recovered
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// The structured value, or the `{"raw_text", "parsing_error"}` wrapper
    pub fn into_value(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Degraded {
                raw_text,
                parsing_error,
            } => json!({
                "raw_text": raw_text,
                "parsing_error": parsing_error,
            }),
        }
    }
}

/// Parse model output into a structured value
///
/// # Examples
///
/// ```
/// use quorum_extractor::parser::{parse_extraction, ParsedExtraction};
///
/// let text = "Here you go:\n```json\n{\"name\": \"Alice\"}\n```";
/// match parse_extraction(text) {
///     ParsedExtraction::Structured(value) => assert_eq!(value["name"], "Alice"),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse_extraction(text: &str) -> ParsedExtraction {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return ParsedExtraction::Structured(value);
    }

    let mut found_candidate = false;

    if let Some(block) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        found_candidate = true;
        if let Ok(value) = serde_json::from_str::<Value>(block.as_str().trim()) {
            return ParsedExtraction::Structured(value);
        }
    }

    if let Some(span) = BRACE_SPAN.find(text) {
        found_candidate = true;
        if let Ok(value) = serde_json::from_str::<Value>(span.as_str()) {
            return ParsedExtraction::Structured(value);
        }
    }

    ParsedExtraction::Degraded {
        raw_text: text.to_string(),
        parsing_error: if found_candidate {
            JSON_DECODE_FAILED
        } else {
            NO_JSON_FOUND
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(text: &str) -> Value {
        match parse_extraction(text) {
            ParsedExtraction::Structured(value) => value,
            other => panic!("expected structured, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let value = structured(r#"{"patient_info": {"name": "Alice"}}"#);
        assert_eq!(value["patient_info"]["name"], "Alice");
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let value = structured("```json\n{\"name\": \"Bob\"}\n```");
        assert_eq!(value["name"], "Bob");
    }

    #[test]
    fn test_parse_markdown_without_language() {
        let value = structured("```\n{\"name\": \"Bob\"}\n```");
        assert_eq!(value["name"], "Bob");
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let raw = r#"{"a": {"b": [1, 2]}, "c": null}"#;
        let fenced = format!("Result:\n```json\n{}\n```\nDone.", raw);
        assert_eq!(structured(raw), structured(&fenced));
    }

    #[test]
    fn test_only_first_fenced_block_used() {
        let text = "```json\n{\"n\": 1}\n```\nand\n```json\n{\"n\": 2}\n```";
        assert_eq!(structured(text)["n"], 1);
    }

    #[test]
    fn test_brace_span_in_prose() {
        let value = structured("Sure! The data is {\"name\": \"Carol\"} as requested.");
        assert_eq!(value["name"], "Carol");
    }

    #[test]
    fn test_broken_fence_falls_through_to_brace_span() {
        let text = "```json\n{\"name\": \"Dan\"}, trailing\n```";
        // The fenced interior is not valid JSON, but its brace span is
        assert_eq!(structured(text)["name"], "Dan");
    }

    #[test]
    fn test_empty_string_degrades() {
        let parsed = parse_extraction("");
        assert_eq!(
            parsed,
            ParsedExtraction::Degraded {
                raw_text: String::new(),
                parsing_error: NO_JSON_FOUND,
            }
        );
    }

    #[test]
    fn test_undecodable_span_degrades_with_decode_marker() {
        let parsed = parse_extraction("The form says {name: Alice} I think");
        assert!(!parsed.is_structured());
        let value = parsed.into_value();
        assert_eq!(value["parsing_error"], JSON_DECODE_FAILED);
        assert_eq!(value["raw_text"], "The form says {name: Alice} I think");
    }

    #[test]
    fn test_trailing_brace_in_prose_defeats_span() {
        let parsed = parse_extraction("{\"a\": 1} and also {oops}");
        assert!(!parsed.is_structured());
    }
}
