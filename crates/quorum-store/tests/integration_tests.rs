//! Integration tests for quorum-store
//!
//! These tests verify the full insert/get/update cycle for records and the
//! filesystem blob store.

use quorum_domain::traits::{BlobStore, RecordStore};
use quorum_domain::{ExactDecimal, ProcessingMode, Record, RecordId, RecordUpdate, StoredRecord};
use quorum_store::{FsBlobStore, SqliteRecordStore, StoreError};
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn automatic(session: &str, confidence: f64) -> StoredRecord {
    StoredRecord::new(
        session,
        ProcessingMode::Automatic,
        record(json!({"patient_info": {"name": "Alice", "sex": "F"}, "medications": ["A", "B"]})),
        ExactDecimal::from_f64(confidence),
    )
}

#[test]
fn test_store_initialization() {
    let store = SqliteRecordStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_put_and_get_record() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = automatic("session-1", 0.8333333333333334);

    let id = store.put_record(original.clone()).unwrap();
    assert_eq!(id, original.id);

    let retrieved = store.get_record(id).unwrap().expect("record should exist");
    assert_eq!(retrieved, original);
    // Key order of the nested data survives the JSON column
    let keys: Vec<_> = retrieved.data.keys().cloned().collect();
    assert_eq!(keys, ["patient_info", "medications"]);
}

#[test]
fn test_confidence_keeps_exact_digits() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = automatic("s", 2.0 / 3.0);
    let id = store.put_record(original).unwrap();

    let retrieved = store.get_record(id).unwrap().unwrap();
    assert_eq!(
        retrieved.confidence_score.unwrap().as_str(),
        "0.6666666666666666"
    );
}

#[test]
fn test_human_review_record() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let reviewed = StoredRecord::new(
        "s",
        ProcessingMode::HumanReview,
        record(json!({"name": "Bob"})),
        Some(ExactDecimal::one()),
    );
    let id = store.put_record(reviewed).unwrap();

    let retrieved = store.get_record(id).unwrap().unwrap();
    assert!(retrieved.human_reviewed);
    assert_eq!(retrieved.processing_mode, ProcessingMode::HumanReview);
    assert_eq!(retrieved.confidence_score, Some(ExactDecimal::one()));
}

#[test]
fn test_missing_confidence_is_null() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = StoredRecord::new("s", ProcessingMode::Automatic, Record::new(), None);
    let id = store.put_record(original).unwrap();
    assert!(store.get_record(id).unwrap().unwrap().confidence_score.is_none());
}

#[test]
fn test_duplicate_rejected() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = automatic("s", 0.5);

    assert!(store.put_record(original.clone()).is_ok());
    assert!(matches!(
        store.put_record(original),
        Err(StoreError::Duplicate(_))
    ));
}

#[test]
fn test_get_nonexistent_record() {
    let store = SqliteRecordStore::new(":memory:").unwrap();
    assert!(store.get_record(RecordId::new()).unwrap().is_none());
}

#[test]
fn test_mark_reviewed_update() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = automatic("s", 0.5);
    let id = store.put_record(original.clone()).unwrap();

    let corrected = record(json!({"patient_info": {"name": "Alicia"}}));
    let updated = store
        .update_record(id, RecordUpdate::mark_reviewed(Some(corrected.clone())))
        .unwrap()
        .expect("record should exist");

    assert!(updated.human_reviewed);
    assert_eq!(updated.processing_mode, ProcessingMode::HumanReview);
    assert_eq!(updated.data, corrected);
    assert_eq!(updated.created_at, original.created_at);

    // The update is persisted, not just returned
    assert_eq!(store.get_record(id).unwrap().unwrap(), updated);
}

#[test]
fn test_partial_update_keeps_other_fields() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let original = automatic("s", 0.75);
    let id = store.put_record(original.clone()).unwrap();

    let update = RecordUpdate {
        human_reviewed: Some(true),
        ..RecordUpdate::default()
    };
    let updated = store.update_record(id, update).unwrap().unwrap();

    assert!(updated.human_reviewed);
    assert_eq!(updated.processing_mode, ProcessingMode::Automatic);
    assert_eq!(updated.data, original.data);
    assert_eq!(updated.confidence_score, original.confidence_score);
}

#[test]
fn test_update_nonexistent_record() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let result = store
        .update_record(RecordId::new(), RecordUpdate::mark_reviewed(None))
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_records_for_session_sorted_by_id() {
    let mut store = SqliteRecordStore::new(":memory:").unwrap();
    let first = automatic("shared", 0.5);
    let second = automatic("shared", 0.9);
    store.put_record(first.clone()).unwrap();
    store.put_record(automatic("other", 1.0)).unwrap();
    store.put_record(second.clone()).unwrap();

    let ids: Vec<_> = store
        .records_for_session("shared")
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn test_records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quorum.db");
    let original = automatic("s", 0.5);

    {
        let mut store = SqliteRecordStore::new(&path).unwrap();
        store.put_record(original.clone()).unwrap();
    }

    let store = SqliteRecordStore::new(&path).unwrap();
    assert_eq!(store.get_record(original.id).unwrap(), Some(original));
}

#[test]
fn test_fs_blob_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path().join("blobs")).unwrap();

    blobs
        .put("voting_uploads/abc/form.png", b"\x89PNG", "image/png")
        .unwrap();
    assert_eq!(blobs.get("voting_uploads/abc/form.png").unwrap(), b"\x89PNG");
    assert!(dir.path().join("blobs/voting_uploads/abc/form.png").exists());
}

#[test]
fn test_fs_blob_store_errors() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path()).unwrap();

    assert!(matches!(blobs.get("missing.json"), Err(StoreError::NotFound(_))));
    assert!(matches!(
        blobs.put("../escape.txt", b"x", "text/plain"),
        Err(StoreError::InvalidKey(_))
    ));
}
