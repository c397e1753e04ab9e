//! Vote command implementation.

use crate::cli::{ManifestArg, VoteArgs};
use crate::config::{Config, OutputFormat};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use quorum_domain::traits::VisionProvider;
use quorum_domain::Manifest;
use quorum_extractor::{ExtractorConfig, Orchestrator, ProcessingOutcome, SchemaPrompt};
use quorum_llm::OllamaProvider;
use std::fmt::Display;
use std::fs;
use tracing::info;

/// Execute the vote command.
pub async fn execute_vote(args: VoteArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let image = fs::read(&args.image).map_err(|e| {
        CliError::InvalidInput(format!("cannot read {}: {}", args.image.display(), e))
    })?;

    let mut extractor = config.extractor.clone();
    if args.concurrent {
        extractor.concurrent_runs = true;
    }

    let endpoint = args.endpoint.as_deref().unwrap_or(&config.ollama_endpoint);
    info!("Using vision endpoint {}", endpoint);
    let provider = OllamaProvider::new(endpoint)
        .with_temperature(extractor.temperature)
        .with_max_tokens(extractor.max_tokens);

    let manifest = manifest_for(args.manifest, &extractor);
    let orchestrator = Orchestrator::new(provider, extractor, SchemaPrompt::medical_certificate());
    let outcome = run_vote(&orchestrator, &image, &manifest).await?;

    println!("{}", formatter.format_outcome(&outcome)?);

    if let Some(failure) = outcome.voting_result.error {
        return Err(CliError::VotingFailed(failure));
    }
    if formatter.format() == OutputFormat::Table {
        eprintln!(
            "{}",
            formatter.success(&format!(
                "Voted {} field(s) from {} run(s)",
                outcome.voting_result.vote_details.len(),
                outcome.summary.total_runs
            ))
        );
    }

    Ok(())
}

/// Build the manifest the `--manifest` flag names
pub fn manifest_for(arg: ManifestArg, config: &ExtractorConfig) -> Manifest {
    match arg {
        ManifestArg::Broad => config.broad_manifest(),
        ManifestArg::Enhanced => config.enhanced_manifest(),
    }
}

/// Run `manifest` against `image`
pub async fn run_vote<P>(
    orchestrator: &Orchestrator<P>,
    image: &[u8],
    manifest: &Manifest,
) -> Result<ProcessingOutcome>
where
    P: VisionProvider + Send + Sync + 'static,
    P::Error: Display,
{
    info!("Running {} extraction(s)", manifest.len());
    Ok(orchestrator.process(image, manifest).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_llm::MockProvider;

    fn config() -> ExtractorConfig {
        ExtractorConfig {
            primary_model: "p".to_string(),
            secondary_model: "s".to_string(),
            review_model: "r".to_string(),
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_manifest_for() {
        let broad = manifest_for(ManifestArg::Broad, &config());
        assert_eq!(broad.len(), 4);

        let enhanced = manifest_for(ManifestArg::Enhanced, &config());
        let models: Vec<_> = enhanced.iter().map(|r| r.model_identity.as_str()).collect();
        assert_eq!(models, ["p", "s", "r"]);
    }

    #[tokio::test]
    async fn test_run_vote_with_mock() {
        let mut provider = MockProvider::default();
        provider.add_response("p", r#"{"diagnosis": "influenza"}"#);
        provider.add_response("s", r#"{"diagnosis": "influenza"}"#);
        provider.add_response("r", r#"{"diagnosis": "common cold"}"#);

        let orchestrator = Orchestrator::new(provider, config(), SchemaPrompt::medical_certificate());
        let manifest = manifest_for(ManifestArg::Enhanced, orchestrator.config());
        let outcome = run_vote(&orchestrator, b"image", &manifest).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.voting_result.final_result["diagnosis"], "influenza");
    }

    #[tokio::test]
    async fn test_run_vote_rejects_empty_image() {
        let orchestrator = Orchestrator::new(MockProvider::default(), config(), SchemaPrompt::medical_certificate());
        let manifest = manifest_for(ManifestArg::Broad, orchestrator.config());
        let result = run_vote(&orchestrator, b"", &manifest).await;
        assert!(matches!(result, Err(CliError::Extraction(_))));
    }
}
