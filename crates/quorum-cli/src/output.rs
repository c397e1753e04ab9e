//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use quorum_domain::{ExtractionRun, RunOutcome, StoredRecord, VoteDetail};
use quorum_extractor::summary::{HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD};
use quorum_extractor::ProcessingOutcome;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest failure detail shown in the runs table
const MAX_DETAIL_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the runs, vote and summary of one processing request.
    pub fn format_outcome(&self, outcome: &ProcessingOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
            OutputFormat::Table => Ok(self.format_outcome_table(outcome)),
        }
    }

    /// Format a stored record.
    pub fn format_record(&self, record: &StoredRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
            OutputFormat::Table => self.format_record_table(record),
        }
    }

    fn format_outcome_table(&self, outcome: &ProcessingOutcome) -> String {
        let mut sections = vec![self.runs_table(&outcome.individual_results)];

        let voting = &outcome.voting_result;
        match voting.error {
            Some(failure) => sections.push(self.error(failure.message())),
            None => sections.push(self.fields_table(voting.vote_details.iter())),
        }

        let summary = &outcome.summary;
        sections.push(format!(
            "Runs: {}/{} succeeded ({:.0}%)  Average confidence: {:.2}",
            summary.successful_runs,
            summary.total_runs,
            summary.success_rate * 100.0,
            summary.average_confidence
        ));
        if !summary.low_confidence_fields.is_empty() {
            sections.push(self.warning(&format!(
                "Low confidence: {}",
                summary.low_confidence_fields.join(", ")
            )));
        }

        sections.join("\n")
    }

    fn runs_table(&self, runs: &[ExtractionRun]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Model", "Run", "Status", "Time (ms)", "Detail"]);

        for run in runs {
            let (status, detail) = match &run.outcome {
                RunOutcome::Succeeded { structured_record } => (
                    self.colorize("ok", "green"),
                    format!("{} top-level field(s)", structured_record.len()),
                ),
                RunOutcome::Failed { error_detail } => {
                    (self.colorize("failed", "red"), truncate(error_detail, MAX_DETAIL_CHARS))
                }
            };
            builder.push_record([
                run.model_identity.clone(),
                run.run_index.to_string(),
                status,
                run.elapsed_ms.to_string(),
                detail,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn fields_table<'a>(&self, details: impl Iterator<Item = (&'a String, &'a VoteDetail)>) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value", "Votes", "Confidence"]);

        for (path, detail) in details {
            let votes = detail
                .vote_tally
                .iter()
                .map(|entry| format!("{} x{}", entry.value, entry.count))
                .collect::<Vec<_>>()
                .join(", ");
            builder.push_record([
                path.clone(),
                detail.winning_value.clone(),
                votes,
                self.confidence(detail.confidence),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn format_record_table(&self, record: &StoredRecord) -> Result<String> {
        let confidence = record
            .confidence_score
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());

        let mut builder = Builder::default();
        builder.push_record(["Property", "Value"]);
        builder.push_record(["ID".to_string(), record.id.to_string()]);
        builder.push_record(["Session".to_string(), record.session_id.clone()]);
        builder.push_record(["Mode".to_string(), record.processing_mode.as_str().to_string()]);
        builder.push_record(["Reviewed".to_string(), record.human_reviewed.to_string()]);
        builder.push_record(["Confidence".to_string(), confidence]);
        builder.push_record(["Created".to_string(), record.created_at.clone()]);
        builder.push_record(["Updated".to_string(), record.updated_at.clone()]);

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let data = serde_json::to_string_pretty(&record.data)?;
        Ok(format!("{}\n{}", table, data))
    }

    fn confidence(&self, confidence: f64) -> String {
        let text = format!("{:.2}", confidence);
        if confidence >= HIGH_CONFIDENCE_THRESHOLD {
            self.colorize(&text, "green")
        } else if confidence < LOW_CONFIDENCE_THRESHOLD {
            self.colorize(&text, "red")
        } else {
            self.colorize(&text, "yellow")
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::{ExactDecimal, ModelRun, ProcessingMode};
    use quorum_extractor::{summarize, vote_on_runs, ListVotePolicy};
    use serde_json::json;

    fn outcome(responses: &[Option<serde_json::Value>]) -> ProcessingOutcome {
        let runs: Vec<ExtractionRun> = responses
            .iter()
            .enumerate()
            .map(|(i, response)| {
                let run = ModelRun::new(format!("model-{}", i), 1);
                match response {
                    Some(value) => ExtractionRun::success(
                        &run,
                        value.to_string(),
                        value.as_object().cloned().unwrap(),
                        10,
                    ),
                    None => ExtractionRun::failure(&run, "", "connection refused", 5),
                }
            })
            .collect();
        let voting_result = vote_on_runs(&runs, ListVotePolicy::OrderSensitive);
        let summary = summarize(&runs, &voting_result);
        ProcessingOutcome {
            individual_results: runs,
            voting_result,
            summary,
        }
    }

    #[test]
    fn test_outcome_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let outcome = outcome(&[
            Some(json!({"patient_info": {"name": "Alice"}})),
            Some(json!({"patient_info": {"name": "Alice"}})),
            None,
        ]);

        let output = formatter.format_outcome(&outcome).unwrap();
        assert!(output.contains("patient_info.name"));
        assert!(output.contains("Alice x2"));
        assert!(output.contains("connection refused"));
        assert!(output.contains("Runs: 2/3 succeeded"));
    }

    #[test]
    fn test_outcome_table_all_failed() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let outcome = outcome(&[None, None]);

        let output = formatter.format_outcome(&outcome).unwrap();
        assert!(output.contains("✗ all model runs failed"));
    }

    #[test]
    fn test_outcome_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let outcome = outcome(&[Some(json!({"diagnosis": "influenza"}))]);

        let output = formatter.format_outcome(&outcome).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["voting_result"]["final_result"]["diagnosis"], "influenza");
    }

    #[test]
    fn test_record_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let record = StoredRecord::new(
            "session-1",
            ProcessingMode::HumanReview,
            json!({"name": "Bob"}).as_object().cloned().unwrap(),
            Some(ExactDecimal::one()),
        );

        let output = formatter.format_record(&record).unwrap();
        assert!(output.contains("session-1"));
        assert!(output.contains("human_review"));
        assert!(output.contains("\"name\": \"Bob\""));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
