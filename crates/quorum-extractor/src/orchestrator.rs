//! Multi-run orchestration

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{parse_extraction, ParsedExtraction};
use crate::prompt::{PromptPurpose, SchemaPrompt};
use crate::summary::summarize;
use crate::types::ProcessingOutcome;
use crate::voting::vote_on_runs;
use quorum_domain::traits::VisionProvider;
use quorum_domain::{ExtractionRun, Manifest, ModelRun};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Runs a manifest of vision calls against one document and votes on the results
///
/// Every manifest entry yields exactly one [`ExtractionRun`]. Provider errors,
/// timeouts and unparseable output are recorded as failed runs; they never
/// abort the remaining entries.
pub struct Orchestrator<P>
where
    P: VisionProvider,
{
    provider: Arc<P>,
    config: ExtractorConfig,
    prompt: SchemaPrompt,
}

/// A dispatched call that has not been awaited yet
struct PendingRun {
    run: ModelRun,
    started: Instant,
    handle: JoinHandle<Result<String, String>>,
}

impl<P> Orchestrator<P>
where
    P: VisionProvider + Send + Sync + 'static,
    P::Error: std::fmt::Display,
{
    /// Create a new Orchestrator
    pub fn new(provider: P, config: ExtractorConfig, prompt: SchemaPrompt) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
            prompt,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The document schema prompt
    pub fn prompt(&self) -> &SchemaPrompt {
        &self.prompt
    }

    /// Run every manifest entry against `image`, then vote
    ///
    /// # Errors
    ///
    /// Only for requests that cannot start: an empty or oversized image, or an
    /// empty manifest. A batch where every run fails still returns `Ok` with
    /// the all-failed voting shape.
    pub async fn process(
        &self,
        image: &[u8],
        manifest: &Manifest,
    ) -> Result<ProcessingOutcome, ExtractorError> {
        self.check_image(image)?;
        if manifest.is_empty() {
            return Err(ExtractorError::EmptyManifest);
        }

        info!(
            "Starting {} runs on {} byte document ({})",
            manifest.len(),
            image.len(),
            if self.config.concurrent_runs { "concurrent" } else { "sequential" }
        );

        let image: Arc<[u8]> = Arc::from(image);
        let prompt: Arc<str> = Arc::from(self.prompt.build(PromptPurpose::Voting));
        let mut runs = Vec::with_capacity(manifest.len());

        if self.config.concurrent_runs {
            let pending: Vec<PendingRun> = manifest
                .iter()
                .map(|run| self.dispatch(&image, &prompt, run))
                .collect();
            for entry in pending {
                runs.push(self.settle(entry).await);
            }
        } else {
            for run in manifest.iter() {
                let entry = self.dispatch(&image, &prompt, run);
                runs.push(self.settle(entry).await);
            }
        }

        let voting_result = vote_on_runs(&runs, self.config.list_policy);
        let summary = summarize(&runs, &voting_result);

        info!(
            "Processing complete: {}/{} runs succeeded, {} fields, average confidence {:.2}",
            summary.successful_runs,
            summary.total_runs,
            voting_result.vote_details.len(),
            summary.average_confidence
        );

        Ok(ProcessingOutcome {
            individual_results: runs,
            voting_result,
            summary,
        })
    }

    /// Run the review model once with the human-review prompt
    ///
    /// The returned run may have failed; the caller decides what a person
    /// sees in that case.
    pub async fn extract_for_review(&self, image: &[u8]) -> Result<ExtractionRun, ExtractorError> {
        self.check_image(image)?;

        let run = ModelRun::new(self.config.review_model.clone(), 1);
        info!("Starting review extraction with {}", run.model_identity);

        let image: Arc<[u8]> = Arc::from(image);
        let prompt: Arc<str> = Arc::from(self.prompt.build(PromptPurpose::HumanReview));
        let entry = self.dispatch(&image, &prompt, &run);
        Ok(self.settle(entry).await)
    }

    fn check_image(&self, image: &[u8]) -> Result<(), ExtractorError> {
        if image.is_empty() {
            return Err(ExtractorError::EmptyImage);
        }
        if image.len() > self.config.max_image_bytes {
            return Err(ExtractorError::ImageTooLarge(
                image.len(),
                self.config.max_image_bytes,
            ));
        }
        Ok(())
    }

    /// Start one call on the blocking pool
    fn dispatch(&self, image: &Arc<[u8]>, prompt: &Arc<str>, run: &ModelRun) -> PendingRun {
        debug!("Dispatching {}", run);

        let provider = Arc::clone(&self.provider);
        let image = Arc::clone(image);
        let prompt = Arc::clone(prompt);
        let model = run.model_identity.clone();

        // VisionProvider is not async
        let handle = tokio::task::spawn_blocking(move || {
            provider
                .extract(&image, &prompt, &model)
                .map_err(|e| e.to_string())
        });

        PendingRun {
            run: run.clone(),
            started: Instant::now(),
            handle,
        }
    }

    /// Wait for one call and turn whatever happened into an ExtractionRun
    async fn settle(&self, pending: PendingRun) -> ExtractionRun {
        let PendingRun {
            run,
            started,
            mut handle,
        } = pending;
        let deadline = started + self.config.run_timeout();

        let joined = timeout_at(deadline, &mut handle).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match joined {
            Err(_) => {
                warn!("{} timed out after {}s", run, self.config.run_timeout_secs);
                ExtractionRun::failure(
                    &run,
                    "",
                    format!("timed out after {}s", self.config.run_timeout_secs),
                    elapsed_ms,
                )
            }
            Ok(Err(join_error)) => {
                warn!("{} task failed: {}", run, join_error);
                ExtractionRun::failure(&run, "", format!("task join error: {}", join_error), elapsed_ms)
            }
            Ok(Ok(Err(provider_error))) => {
                warn!("{} failed: {}", run, provider_error);
                ExtractionRun::failure(&run, "", provider_error, elapsed_ms)
            }
            Ok(Ok(Ok(text))) => interpret(&run, text, elapsed_ms),
        }
    }
}

/// Parse returned text into a successful or failed run
fn interpret(run: &ModelRun, text: String, elapsed_ms: u64) -> ExtractionRun {
    match parse_extraction(&text) {
        ParsedExtraction::Structured(Value::Object(record)) => {
            debug!("{} returned {} top-level fields in {}ms", run, record.len(), elapsed_ms);
            ExtractionRun::success(run, text, record, elapsed_ms)
        }
        ParsedExtraction::Structured(other) => {
            warn!("{} returned JSON that is not an object", run);
            let kind = match other {
                Value::Array(_) => "array",
                Value::String(_) => "string",
                Value::Number(_) => "number",
                Value::Bool(_) => "boolean",
                _ => "null",
            };
            ExtractionRun::failure(run, text, format!("expected a JSON object, got {}", kind), elapsed_ms)
        }
        ParsedExtraction::Degraded { parsing_error, .. } => {
            warn!("{} output could not be parsed: {}", run, parsing_error);
            ExtractionRun::failure(run, text, parsing_error, elapsed_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_object() {
        let run = ModelRun::new("m", 1);
        let result = interpret(&run, "```json\n{\"a\": \"b\"}\n```".to_string(), 3);
        assert!(result.succeeded());
        assert_eq!(result.structured_record().unwrap()["a"], "b");
        assert!(result.raw_text.starts_with("```json"));
        assert_eq!(result.elapsed_ms, 3);
    }

    #[test]
    fn test_interpret_non_object() {
        let run = ModelRun::new("m", 1);
        let result = interpret(&run, "[1, 2]".to_string(), 0);
        assert!(!result.succeeded());
        assert_eq!(result.error_detail(), Some("expected a JSON object, got array"));
        assert_eq!(result.raw_text, "[1, 2]");
    }

    #[test]
    fn test_interpret_prose() {
        let run = ModelRun::new("m", 1);
        let result = interpret(&run, "I cannot read this image.".to_string(), 0);
        assert_eq!(result.error_detail(), Some(crate::parser::NO_JSON_FOUND));
    }
}
