//! Document intake: uploads, processing modes, and record persistence
//!
//! `IntakeService` ties the orchestrator to the blob store and the record
//! store. Every upload is kept under a per-session key and every processing
//! pass is archived as JSON next to it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use quorum_domain::traits::{BlobStore, RecordStore, VisionProvider};
use quorum_domain::{
    ExactDecimal, ExtractionRun, Manifest, ProcessingMode, Record, RecordId, RecordUpdate,
    StoredRecord, VotingFailure,
};
use quorum_extractor::{ExtractorError, Orchestrator, ProcessingOutcome};
use quorum_llm::LlmError;
use quorum_store::{SqliteRecordStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

/// File extensions accepted for upload
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "pdf", "tiff"];

/// Any vision provider whose calls fail with [`LlmError`]
pub type SharedVisionProvider = Box<dyn VisionProvider<Error = LlmError> + Send + Sync>;

/// Any blob store backed by quorum-store
pub type SharedBlobStore = Arc<dyn BlobStore<Error = StoreError> + Send + Sync>;

/// Errors surfaced by intake operations
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Request carried no `file` field
    #[error("No file uploaded")]
    NoFile,

    /// Upload failed validation
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// Upload exceeds the configured limit
    #[error("File too large: {0} bytes (max: {1})")]
    FileTooLarge(usize, usize),

    /// Review submission is missing session_id or reviewed_data
    #[error("session_id and reviewed_data are required")]
    MissingParameters,

    /// Path segment is not a record id
    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),

    /// No record with this id
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Voting produced no canonical record
    #[error("Processing failed: {0}")]
    VotingFailed(VotingFailure),

    /// Request rejected by the orchestrator
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractorError),

    /// Blob or record store failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Archive serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record store lock poisoned
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One uploaded document
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name
    pub filename: String,
    /// Client-supplied content type, if any
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Result of a vote-only pass
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Whether voting produced a canonical record
    pub success: bool,
    /// Processing session
    pub session_id: String,
    /// Sanitized file name
    pub filename: String,
    /// The upload as a data URL, for display
    pub image_data: String,
    /// Runs, vote and summary
    pub voting_results: ProcessingOutcome,
    /// Voting failure message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of the automatic processing mode
#[derive(Debug, Serialize, Deserialize)]
pub struct AutomaticResponse {
    /// Always true; failures are errors
    pub success: bool,
    /// Processing session
    pub session_id: String,
    /// Sanitized file name
    pub filename: String,
    /// The upload as a data URL, for display
    pub image_data: String,
    /// Always `automatic`
    pub processing_mode: ProcessingMode,
    /// Runs, vote and summary
    pub voting_results: ProcessingOutcome,
    /// Id of the persisted record
    pub record_id: RecordId,
    /// Mean vote confidence as stored
    pub confidence_score: ExactDecimal,
}

/// Result of the human-review processing mode, awaiting a person
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingReviewResponse {
    /// Always true; failures are errors
    pub success: bool,
    /// Processing session
    pub session_id: String,
    /// Sanitized file name
    pub filename: String,
    /// The upload as a data URL, for display
    pub image_data: String,
    /// Always `human_review`
    pub processing_mode: ProcessingMode,
    /// Always `pending_review`
    pub status: String,
    /// The single review-model run
    pub extraction: ExtractionRun,
    /// Fields for the reviewer; the empty template when the run failed
    pub extracted_fields: Record,
    /// Blob key of the pending archive
    pub pending_key: String,
}

/// Reviewer-confirmed fields for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Session the review belongs to
    #[serde(default)]
    pub session_id: Option<String>,
    /// Confirmed or edited fields
    #[serde(default)]
    pub reviewed_data: Option<Record>,
}

/// Result of a review submission
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewSubmitted {
    /// Always true; failures are errors
    pub success: bool,
    /// Session the review belongs to
    pub session_id: String,
    /// Always `completed`
    pub status: String,
    /// Id of the persisted record
    pub record_id: RecordId,
}

/// Configured models and the manifests built from them
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsInfo {
    /// Strongest voting model
    pub primary_model: String,
    /// Second voting model
    pub secondary_model: String,
    /// Model used for human review and the enhanced manifest
    pub review_model: String,
    /// Runs for `upload_and_vote`
    pub broad_manifest: Manifest,
    /// Runs for `process_automatic`
    pub enhanced_manifest: Manifest,
}

/// Upload handling, processing modes, and record access
pub struct IntakeService {
    orchestrator: Orchestrator<SharedVisionProvider>,
    blobs: SharedBlobStore,
    records: Mutex<SqliteRecordStore>,
    max_upload_bytes: usize,
}

impl IntakeService {
    /// Create a new IntakeService
    pub fn new(
        orchestrator: Orchestrator<SharedVisionProvider>,
        blobs: SharedBlobStore,
        records: SqliteRecordStore,
    ) -> Self {
        let max_upload_bytes = orchestrator.config().max_image_bytes;
        Self {
            orchestrator,
            blobs,
            records: Mutex::new(records),
            max_upload_bytes,
        }
    }

    /// Set the largest accepted upload
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Largest accepted upload
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Configured models and manifests
    pub fn models(&self) -> ModelsInfo {
        let config = self.orchestrator.config();
        ModelsInfo {
            primary_model: config.primary_model.clone(),
            secondary_model: config.secondary_model.clone(),
            review_model: config.review_model.clone(),
            broad_manifest: config.broad_manifest(),
            enhanced_manifest: config.enhanced_manifest(),
        }
    }

    /// Run the broad manifest and archive the result; nothing is persisted
    pub async fn upload_and_vote(&self, upload: Upload) -> Result<VoteResponse, IntakeError> {
        let accepted = self.accept(upload, "voting_uploads")?;
        let manifest = self.orchestrator.config().broad_manifest();

        let outcome = self.orchestrator.process(&accepted.bytes, &manifest).await?;

        self.archive(
            &date_key("voting_results", &accepted.session_id),
            json!({
                "session_id": accepted.session_id,
                "filename": accepted.filename,
                "processed_at": now_rfc3339(),
                "voting_results": outcome,
            }),
        )?;

        let error = outcome.voting_result.error.map(|e| e.to_string());
        Ok(VoteResponse {
            success: outcome.is_success(),
            session_id: accepted.session_id,
            filename: accepted.filename,
            image_data: accepted.image_data,
            voting_results: outcome,
            error,
        })
    }

    /// Run the enhanced manifest and persist the winner as an automatic record
    pub async fn process_automatic(&self, upload: Upload) -> Result<AutomaticResponse, IntakeError> {
        let accepted = self.accept(upload, "automatic_uploads")?;
        let manifest = self.orchestrator.config().enhanced_manifest();
        let results_key = date_key("automatic_results", &accepted.session_id);

        let outcome = self.orchestrator.process(&accepted.bytes, &manifest).await?;

        if let Some(failure) = outcome.voting_result.error {
            warn!("Automatic processing failed for {}: {}", accepted.session_id, failure);
            self.archive(
                &results_key,
                json!({
                    "session_id": accepted.session_id,
                    "filename": accepted.filename,
                    "processed_at": now_rfc3339(),
                    "processing_mode": ProcessingMode::Automatic,
                    "voting_results": outcome,
                    "record_id": Value::Null,
                }),
            )?;
            return Err(IntakeError::VotingFailed(failure));
        }

        let average = outcome.voting_result.average_confidence();
        let confidence_score = ExactDecimal::from_f64(average)
            .ok_or_else(|| IntakeError::Internal(format!("Non-finite confidence {}", average)))?;

        let record = StoredRecord::new(
            accepted.session_id.clone(),
            ProcessingMode::Automatic,
            outcome.voting_result.final_result.clone(),
            Some(confidence_score.clone()),
        );
        let record_id = self.insert_record(record)?;

        self.archive(
            &results_key,
            json!({
                "session_id": accepted.session_id,
                "filename": accepted.filename,
                "processed_at": now_rfc3339(),
                "processing_mode": ProcessingMode::Automatic,
                "voting_results": outcome,
                "record_id": record_id,
            }),
        )?;

        info!(
            "Stored automatic record {} for session {} (confidence {})",
            record_id, accepted.session_id, confidence_score
        );

        Ok(AutomaticResponse {
            success: true,
            session_id: accepted.session_id,
            filename: accepted.filename,
            image_data: accepted.image_data,
            processing_mode: ProcessingMode::Automatic,
            voting_results: outcome,
            record_id,
            confidence_score,
        })
    }

    /// Run the review model once and park the result for a person
    pub async fn process_human_review(
        &self,
        upload: Upload,
    ) -> Result<PendingReviewResponse, IntakeError> {
        let accepted = self.accept(upload, "human_review_uploads")?;

        let extraction = self.orchestrator.extract_for_review(&accepted.bytes).await?;
        let extracted_fields = extraction
            .structured_record()
            .cloned()
            .unwrap_or_else(|| self.orchestrator.prompt().template().clone());

        let pending_key = date_key("pending_review", &accepted.session_id);
        self.archive(
            &pending_key,
            json!({
                "session_id": accepted.session_id,
                "filename": accepted.filename,
                "processed_at": now_rfc3339(),
                "processing_mode": ProcessingMode::HumanReview,
                "status": "pending_review",
                "extraction": extraction,
            }),
        )?;

        Ok(PendingReviewResponse {
            success: true,
            session_id: accepted.session_id,
            filename: accepted.filename,
            image_data: accepted.image_data,
            processing_mode: ProcessingMode::HumanReview,
            status: "pending_review".to_string(),
            extraction,
            extracted_fields,
            pending_key,
        })
    }

    /// Persist reviewer-confirmed fields with full confidence
    pub fn submit_human_review(
        &self,
        submission: ReviewSubmission,
    ) -> Result<ReviewSubmitted, IntakeError> {
        let session_id = submission
            .session_id
            .filter(|s| !s.trim().is_empty())
            .ok_or(IntakeError::MissingParameters)?;
        let reviewed_data = submission
            .reviewed_data
            .filter(|d| !d.is_empty())
            .ok_or(IntakeError::MissingParameters)?;

        let record = StoredRecord::new(
            session_id.clone(),
            ProcessingMode::HumanReview,
            reviewed_data.clone(),
            Some(ExactDecimal::one()),
        );
        let record_id = self.insert_record(record)?;

        let now = now_rfc3339();
        self.archive(
            &date_key("human_reviewed", &session_id),
            json!({
                "session_id": session_id,
                "processed_at": now,
                "reviewed_at": now,
                "processing_mode": ProcessingMode::HumanReview,
                "status": "completed",
                "reviewed_data": reviewed_data,
                "record_id": record_id,
            }),
        )?;

        info!("Stored reviewed record {} for session {}", record_id, session_id);

        Ok(ReviewSubmitted {
            success: true,
            session_id,
            status: "completed".to_string(),
            record_id,
        })
    }

    /// Fetch a stored record by its string id
    pub fn get_record(&self, id: &str) -> Result<StoredRecord, IntakeError> {
        let id = parse_record_id(id)?;
        self.records()?
            .get_record(id)?
            .ok_or(IntakeError::RecordNotFound(id))
    }

    /// Records created in one processing session, oldest first
    ///
    /// An unknown session has no records; that is not an error.
    pub fn session_records(&self, session_id: &str) -> Result<Vec<StoredRecord>, IntakeError> {
        Ok(self.records()?.records_for_session(session_id)?)
    }

    /// Mark a record reviewed, optionally replacing its data
    pub fn mark_reviewed(&self, id: &str, data: Option<Record>) -> Result<StoredRecord, IntakeError> {
        let id = parse_record_id(id)?;
        let updated = self
            .records()?
            .update_record(id, RecordUpdate::mark_reviewed(data))?
            .ok_or(IntakeError::RecordNotFound(id))?;
        info!("Record {} marked reviewed", id);
        Ok(updated)
    }

    /// Validate an upload, store it, and open a session
    fn accept(&self, upload: Upload, prefix: &str) -> Result<AcceptedUpload, IntakeError> {
        let filename = validate_upload(&upload, self.max_upload_bytes)?;
        let content_type = upload
            .content_type
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| guess_content_type(&filename).to_string());
        let session_id = uuid::Uuid::now_v7().to_string();

        let key = format!("{}/{}/{}", prefix, session_id, filename);
        self.blobs.put(&key, &upload.bytes, &content_type)?;
        info!("Accepted {} ({} bytes) as session {}", filename, upload.bytes.len(), session_id);

        let image_data = format!("data:{};base64,{}", content_type, BASE64.encode(&upload.bytes));

        Ok(AcceptedUpload {
            session_id,
            filename,
            bytes: upload.bytes,
            image_data,
        })
    }

    fn archive(&self, key: &str, body: Value) -> Result<(), IntakeError> {
        let bytes = serde_json::to_vec_pretty(&body)?;
        self.blobs.put(key, &bytes, "application/json")?;
        Ok(())
    }

    fn insert_record(&self, record: StoredRecord) -> Result<RecordId, IntakeError> {
        Ok(self.records()?.put_record(record)?)
    }

    fn records(&self) -> Result<MutexGuard<'_, SqliteRecordStore>, IntakeError> {
        self.records
            .lock()
            .map_err(|e| IntakeError::Internal(format!("Record store lock poisoned: {}", e)))
    }
}

struct AcceptedUpload {
    session_id: String,
    filename: String,
    bytes: Vec<u8>,
    image_data: String,
}

/// Check name, type and size; returns the sanitized file name
pub fn validate_upload(upload: &Upload, max_bytes: usize) -> Result<String, IntakeError> {
    if upload.filename.is_empty() {
        return Err(IntakeError::InvalidFile("file name is empty".to_string()));
    }
    let filename = sanitize_filename(&upload.filename);
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IntakeError::InvalidFile(format!(
            "unsupported file type; allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if upload.bytes.is_empty() {
        return Err(IntakeError::InvalidFile("file is empty".to_string()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(IntakeError::FileTooLarge(upload.bytes.len(), max_bytes));
    }
    Ok(filename)
}

/// Reduce a client file name to a safe single path segment
///
/// Path separators become word breaks, whitespace runs become `_`, and only
/// ASCII letters, digits, `.`, `_` and `-` survive.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn parse_record_id(id: &str) -> Result<RecordId, IntakeError> {
    RecordId::from_string(id).map_err(|_| IntakeError::InvalidRecordId(id.to_string()))
}

/// `{prefix}/{YYYY/MM/DD}/{session}.json`
fn date_key(prefix: &str, session_id: &str) -> String {
    format!("{}/{}/{}.json", prefix, Utc::now().format("%Y/%m/%d"), session_id)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
