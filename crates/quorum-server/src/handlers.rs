//! HTTP request handlers for the intake server.
//!
//! Upload routes take a multipart body with a `file` field; the review and
//! record routes take JSON. Every response body is JSON with a `success` flag.

use crate::intake::{
    AutomaticResponse, IntakeError, IntakeService, ModelsInfo, PendingReviewResponse,
    ReviewSubmission, ReviewSubmitted, Upload, VoteResponse,
};
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use quorum_domain::{Record, StoredRecord};
use quorum_extractor::ExtractorError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Multipart framing allowance on top of the upload limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Upload processing and record access
    pub intake: Arc<IntakeService>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// RFC 3339 time of the check
    pub timestamp: String,
    /// Crate version
    pub version: String,
}

/// Models response
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Always true
    pub success: bool,
    /// Configured models and manifests
    pub models: ModelsInfo,
}

/// Stored record response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    /// Always true
    pub success: bool,
    /// The record
    pub record: StoredRecord,
}

/// Records of one session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRecordsResponse {
    /// Always true
    pub success: bool,
    /// The session asked for
    pub session_id: String,
    /// Its records, oldest first
    pub records: Vec<StoredRecord>,
}

/// Body of `POST /records/:id/review`
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    /// Replacement data; the stored data is kept when absent
    #[serde(default)]
    pub data: Option<Record>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Intake operation failed
    Intake(IntakeError),
    /// Request body could not be read
    BadRequest(String),
    /// Request body exceeded the body limit
    PayloadTooLarge,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "File too large".to_string())
            }
            AppError::Intake(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    // Collaborator detail stays in the log
                    error!("Request failed: {}", e);
                    (status, public_message(&e))
                } else {
                    warn!("Request rejected: {}", e);
                    (status, e.to_string())
                }
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });
        (status, body).into_response()
    }
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        AppError::Intake(e)
    }
}

fn status_for(e: &IntakeError) -> StatusCode {
    match e {
        IntakeError::NoFile
        | IntakeError::InvalidFile(_)
        | IntakeError::MissingParameters
        | IntakeError::InvalidRecordId(_)
        | IntakeError::Extraction(ExtractorError::EmptyImage) => StatusCode::BAD_REQUEST,
        IntakeError::FileTooLarge(_, _) | IntakeError::Extraction(ExtractorError::ImageTooLarge(_, _)) => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        IntakeError::RecordNotFound(_) => StatusCode::NOT_FOUND,
        IntakeError::VotingFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeError::Extraction(_)
        | IntakeError::Store(_)
        | IntakeError::Serialization(_)
        | IntakeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn public_message(e: &IntakeError) -> String {
    match e {
        IntakeError::Store(_) => "Storage is unavailable; please retry later".to_string(),
        IntakeError::Extraction(_) => "Extraction could not be started".to_string(),
        _ => "Internal server error".to_string(),
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Pull the `file` field out of a multipart body
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(IntakeError::NoFile.into())
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /models - Configured models and manifests
async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        success: true,
        models: state.intake.models(),
    })
}

/// POST /upload_and_vote - Broad manifest, result archived only
async fn upload_and_vote(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VoteResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(state.intake.upload_and_vote(upload).await?))
}

/// POST /process_automatic - Enhanced manifest, winner persisted
async fn process_automatic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AutomaticResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(state.intake.process_automatic(upload).await?))
}

/// POST /process_human_review - Review model once, pending a person
async fn process_human_review(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PendingReviewResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(state.intake.process_human_review(upload).await?))
}

/// POST /submit_human_review - Persist reviewer-confirmed fields
async fn submit_human_review(
    State(state): State<AppState>,
    body: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Result<Json<ReviewSubmitted>, AppError> {
    let Json(submission) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(state.intake.submit_human_review(submission)?))
}

/// GET /records/:id - Fetch a stored record
async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state.intake.get_record(&id)?;
    Ok(Json(RecordResponse {
        success: true,
        record,
    }))
}

/// GET /sessions/:id/records - List the records a session produced
async fn session_records(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRecordsResponse>, AppError> {
    let records = state.intake.session_records(&session_id)?;
    Ok(Json(SessionRecordsResponse {
        success: true,
        session_id,
        records,
    }))
}

/// POST /records/:id/review - Mark a record reviewed
async fn mark_reviewed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<RecordResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let record = state.intake.mark_reviewed(&id, request.data)?;
    Ok(Json(RecordResponse {
        success: true,
        record,
    }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    let body_limit = state.intake.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/models", get(models))
        .route("/upload_and_vote", post(upload_and_vote))
        .route("/process_automatic", post(process_automatic))
        .route("/process_human_review", post(process_human_review))
        .route("/submit_human_review", post(submit_human_review))
        .route("/records/:id", get(get_record))
        .route("/records/:id/review", post(mark_reviewed))
        .route("/sessions/:id/records", get(session_records))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::VotingFailure;
    use quorum_store::StoreError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&IntakeError::NoFile), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&IntakeError::FileTooLarge(2, 1)),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&IntakeError::Extraction(ExtractorError::ImageTooLarge(2, 1))),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&IntakeError::VotingFailed(VotingFailure::AllRunsFailed)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&IntakeError::Store(StoreError::NotFound("k".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_detail_not_exposed() {
        let e = IntakeError::Store(StoreError::InvalidData("/var/lib/secret.db".to_string()));
        assert!(!public_message(&e).contains("secret"));
    }
}
