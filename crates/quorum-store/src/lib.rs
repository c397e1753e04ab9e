//! Quorum Storage Layer
//!
//! Implements the `RecordStore` trait over SQLite and the `BlobStore` trait
//! over a directory tree or process memory.
//!
//! # Architecture
//!
//! - SQLite for canonical records (JSON data column plus provenance columns)
//! - Confidence kept as exact decimal text, so no precision is lost
//! - Blob keys are relative paths under a root directory
//!
//! # Examples
//!
//! ```no_run
//! use quorum_store::SqliteRecordStore;
//!
//! let store = SqliteRecordStore::new(":memory:").unwrap();
//! // Store is now ready for record operations
//! ```

#![warn(missing_docs)]

pub mod blob;

pub use blob::{FsBlobStore, MemoryBlobStore};

use quorum_domain::traits::RecordStore;
use quorum_domain::{ExactDecimal, ProcessingMode, Record, RecordId, RecordUpdate, StoredRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Blob key would escape the store or is empty
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    /// A record with this ID already exists
    #[error("Duplicate record: {0}")]
    Duplicate(RecordId),
}

/// SQLite-based implementation of RecordStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store behind a mutex, or
/// give each thread its own SqliteRecordStore.
pub struct SqliteRecordStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "SELECT id, session_id, processing_mode, human_reviewed, data,
            confidence_score, created_at, updated_at
     FROM records";

impl SqliteRecordStore {
    /// Create a new SqliteRecordStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Records created in one processing session, oldest first
    pub fn records_for_session(&self, session_id: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!("{} WHERE session_id = ?1 ORDER BY id", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![session_id], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Convert RecordId to bytes for storage
    ///
    /// Big-endian keeps UUIDv7 ids in creation order.
    fn record_id_to_bytes(id: RecordId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to RecordId
    fn bytes_to_record_id(bytes: &[u8]) -> Result<RecordId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!(
                "Expected 16 bytes for RecordId, got {}",
                bytes.len()
            ))
        })?;
        Ok(RecordId::from_value(u128::from_be_bytes(arr)))
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_record_id(&id_bytes).map_err(|e| conversion_error(0, e))?;

        let mode_text: String = row.get(2)?;
        let processing_mode = ProcessingMode::parse(&mode_text).ok_or_else(|| {
            conversion_error(
                2,
                StoreError::InvalidData(format!("Unknown processing mode: {}", mode_text)),
            )
        })?;

        let data_text: String = row.get(4)?;
        let data: Record = serde_json::from_str(&data_text)
            .map_err(|e| conversion_error(4, StoreError::InvalidData(e.to_string())))?;

        let confidence_text: Option<String> = row.get(5)?;
        let confidence_score = match confidence_text {
            Some(text) => Some(ExactDecimal::parse(&text).ok_or_else(|| {
                conversion_error(
                    5,
                    StoreError::InvalidData(format!("Not a decimal: {}", text)),
                )
            })?),
            None => None,
        };

        Ok(StoredRecord {
            id,
            session_id: row.get(1)?,
            processing_mode,
            human_reviewed: row.get(3)?,
            data,
            confidence_score,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn data_to_text(data: &Record) -> Result<String, StoreError> {
        serde_json::to_string(data).map_err(|e| StoreError::InvalidData(e.to_string()))
    }
}

fn conversion_error(column: usize, error: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(error))
}

impl RecordStore for SqliteRecordStore {
    type Error = StoreError;

    fn put_record(&mut self, record: StoredRecord) -> Result<RecordId, Self::Error> {
        let id_bytes = Self::record_id_to_bytes(record.id);

        let exists: bool = self
            .conn
            .query_row("SELECT 1 FROM records WHERE id = ?1", params![&id_bytes], |_| Ok(true))
            .optional()?
            .unwrap_or(false);

        if exists {
            return Err(StoreError::Duplicate(record.id));
        }

        self.conn.execute(
            "INSERT INTO records (id, session_id, processing_mode, human_reviewed, data,
                                  confidence_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &id_bytes,
                &record.session_id,
                record.processing_mode.as_str(),
                record.human_reviewed,
                Self::data_to_text(&record.data)?,
                record.confidence_score.as_ref().map(ExactDecimal::as_str),
                &record.created_at,
                &record.updated_at,
            ],
        )?;

        debug!("Stored record {} ({})", record.id, record.processing_mode);
        Ok(record.id)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<StoredRecord>, Self::Error> {
        let id_bytes = Self::record_id_to_bytes(id);
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);

        let record = self
            .conn
            .query_row(&sql, params![&id_bytes], Self::row_to_record)
            .optional()?;

        Ok(record)
    }

    fn update_record(
        &mut self,
        id: RecordId,
        update: RecordUpdate,
    ) -> Result<Option<StoredRecord>, Self::Error> {
        let Some(mut record) = self.get_record(id)? else {
            return Ok(None);
        };
        record.apply(update);

        self.conn.execute(
            "UPDATE records
             SET processing_mode = ?2, human_reviewed = ?3, data = ?4,
                 confidence_score = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                Self::record_id_to_bytes(id),
                record.processing_mode.as_str(),
                record.human_reviewed,
                Self::data_to_text(&record.data)?,
                record.confidence_score.as_ref().map(ExactDecimal::as_str),
                &record.updated_at,
            ],
        )?;

        debug!("Updated record {}", id);
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_bytes_round_trip() {
        let id = RecordId::new();
        let bytes = SqliteRecordStore::record_id_to_bytes(id);
        assert_eq!(bytes.len(), 16);
        assert_eq!(SqliteRecordStore::bytes_to_record_id(&bytes).unwrap(), id);
    }

    #[test]
    fn test_bad_id_length_rejected() {
        assert!(matches!(
            SqliteRecordStore::bytes_to_record_id(&[1, 2, 3]),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let mut store = SqliteRecordStore::new(":memory:").unwrap();
        assert!(store.initialize_schema().is_ok());
    }
}
