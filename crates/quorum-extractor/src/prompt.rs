//! Vision prompts built from a document schema

use quorum_domain::Record;
use serde_json::{json, Value};

/// What the extraction will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    /// One of several runs that will be voted on
    Voting,
    /// A single run whose output a person will confirm
    HumanReview,
}

/// Schema-driven prompt for one document type
///
/// The template is the empty record the model is asked to fill in; every
/// leaf is an empty string. Hints describe individual leaf keys.
#[derive(Debug, Clone)]
pub struct SchemaPrompt {
    document_kind: String,
    template: Record,
    field_hints: Vec<(String, String)>,
}

impl SchemaPrompt {
    /// Create a prompt for a custom document type
    pub fn new(document_kind: impl Into<String>, template: Record) -> Self {
        Self {
            document_kind: document_kind.into(),
            template,
            field_hints: Vec::new(),
        }
    }

    /// Describe what a leaf key holds
    pub fn with_hint(mut self, key: impl Into<String>, hint: impl Into<String>) -> Self {
        self.field_hints.push((key.into(), hint.into()));
        self
    }

    /// The medical diagnosis certificate schema
    pub fn medical_certificate() -> Self {
        let template = json!({
            "certificate_info": {
                "certificate_no": "",
                "certificate_date": ""
            },
            "patient_info": {
                "name": "",
                "sex": "",
                "date_of_birth": "",
                "nationality": "",
                "passport_no_or_id": "",
                "medical_history_no": "",
                "address": ""
            },
            "examination_info": {
                "date_of_examination": "",
                "department": ""
            },
            "medical_content": {
                "diagnosis": "",
                "doctors_comment": ""
            },
            "hospital_info": {
                "hospital_name_chinese": "",
                "hospital_name_english": "",
                "superintendent": "",
                "attending_physician": ""
            },
            "additional_info": {
                "stamp_or_seal": "",
                "other_notes": ""
            }
        });

        let template = match template {
            Value::Object(map) => map,
            _ => Record::new(),
        };

        Self::new("medical diagnosis certificate", template)
            .with_hint("certificate_no", "certificate number")
            .with_hint("name", "patient full name")
            .with_hint("sex", "sex")
            .with_hint("date_of_birth", "date of birth")
            .with_hint("nationality", "nationality")
            .with_hint("passport_no_or_id", "national ID or passport number")
            .with_hint("medical_history_no", "medical record number")
            .with_hint("address", "home address")
            .with_hint("date_of_examination", "date of examination")
            .with_hint("department", "clinical department")
            .with_hint("diagnosis", "diagnosis text")
            .with_hint("doctors_comment", "physician's comments")
            .with_hint("hospital_name_chinese", "hospital name (Chinese)")
            .with_hint("hospital_name_english", "hospital name (English)")
            .with_hint("superintendent", "hospital superintendent")
            .with_hint("attending_physician", "attending physician")
            .with_hint("certificate_date", "date the certificate was issued")
    }

    /// Document type name
    pub fn document_kind(&self) -> &str {
        &self.document_kind
    }

    /// The empty record the model fills in
    pub fn template(&self) -> &Record {
        &self.template
    }

    /// Build the complete prompt
    pub fn build(&self, purpose: PromptPurpose) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Analyze this {} and extract all of its information as structured JSON.\n",
            self.document_kind
        ));
        if purpose == PromptPurpose::HumanReview {
            prompt.push_str(
                "The result will be checked by a human reviewer, so make sure every \
                 extracted value is accurate and complete.\n",
            );
        }
        prompt.push('\n');

        prompt.push_str("Return JSON in exactly this format (JSON only, nothing else):\n");
        let template = serde_json::to_string_pretty(&self.template).unwrap_or_default();
        prompt.push_str(&template);
        prompt.push_str("\n\n");

        if !self.field_hints.is_empty() {
            prompt.push_str("Carefully place all visible text into the matching fields:\n");
            for (key, hint) in &self.field_hints {
                prompt.push_str(&format!("- {}: {}\n", key, hint));
            }
            prompt.push('\n');
        }

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

impl Default for SchemaPrompt {
    fn default() -> Self {
        Self::medical_certificate()
    }
}

const OUTPUT_FORMAT_REMINDER: &str = "If a field has no information, leave it as an empty string.
Return ONLY the JSON object, no markdown code blocks, no explanations.";
