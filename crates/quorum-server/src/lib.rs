//! Quorum intake server
//!
//! HTTP front end for document uploads. Each upload is extracted by several
//! vision model runs, voted field by field, and either archived, persisted as
//! an automatic record, or parked for human review.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod intake;

use config::ServerConfig;
use handlers::{create_router, AppState};
use intake::IntakeService;
use quorum_extractor::{Orchestrator, SchemaPrompt};
use quorum_llm::OllamaProvider;
use quorum_store::{FsBlobStore, SqliteRecordStore, StoreError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Storage could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Wire the provider, stores and orchestrator described by `config`
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    config.validate()?;

    let provider = OllamaProvider::new(config.ollama_endpoint.clone())
        .with_temperature(config.extractor.temperature)
        .with_max_tokens(config.extractor.max_tokens);
    let orchestrator = Orchestrator::new(
        Box::new(provider) as intake::SharedVisionProvider,
        config.extractor.clone(),
        SchemaPrompt::medical_certificate(),
    );

    let blobs = Arc::new(FsBlobStore::new(&config.blob_root)?);
    let records = SqliteRecordStore::new(&config.database_path)?;

    let intake = IntakeService::new(orchestrator, blobs, records)
        .with_max_upload_bytes(config.max_upload_bytes);

    Ok(AppState {
        intake: Arc::new(intake),
    })
}

/// Start the intake HTTP server
///
/// Opens storage, builds the voting pipeline, and serves until the listener
/// fails.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Quorum intake server");
    info!("Bind address: {}", config.bind_addr());
    info!("Vision endpoint: {}", config.ollama_endpoint);
    info!(
        "Models: primary={} secondary={} review={}",
        config.extractor.primary_model, config.extractor.secondary_model, config.extractor.review_model
    );
    info!("Database: {}", config.database_path);
    info!("Blob root: {}", config.blob_root);

    let state = build_state(&config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_from_test_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default_test_config();
        config.blob_root = dir.path().join("blobs").to_string_lossy().into_owned();
        config.max_upload_bytes = 1024;

        let state = build_state(&config).unwrap();
        assert_eq!(state.intake.max_upload_bytes(), 1024);
        assert_eq!(
            state.intake.models().primary_model,
            config.extractor.primary_model
        );
    }

    #[test]
    fn test_build_state_rejects_invalid_config() {
        let mut config = ServerConfig::default_test_config();
        config.database_path = String::new();
        assert!(matches!(build_state(&config), Err(ServerError::Config(_))));
    }
}
