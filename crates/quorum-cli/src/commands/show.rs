//! Show command implementation.

use crate::cli::ShowArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use quorum_domain::traits::RecordStore;
use quorum_domain::{RecordId, StoredRecord};
use quorum_store::SqliteRecordStore;
use std::path::Path;

/// Execute the show command.
pub fn execute_show(args: ShowArgs, formatter: &Formatter) -> Result<()> {
    let record = load_record(&args.database, &args.id)?;
    println!("{}", formatter.format_record(&record)?);
    Ok(())
}

/// Fetch one record from an existing database
pub fn load_record(database: &Path, id: &str) -> Result<StoredRecord> {
    // Opening a missing path would create an empty database
    if !database.exists() {
        return Err(CliError::NotFound(format!("database {}", database.display())));
    }
    let id = RecordId::from_string(id).map_err(CliError::InvalidInput)?;

    let store = SqliteRecordStore::new(database)?;
    store
        .get_record(id)?
        .ok_or_else(|| CliError::NotFound(format!("record {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::{ExactDecimal, ProcessingMode, Record};

    #[test]
    fn test_load_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let record = StoredRecord::new(
            "session-1",
            ProcessingMode::Automatic,
            Record::new(),
            ExactDecimal::from_f64(0.75),
        );
        {
            let mut store = SqliteRecordStore::new(&path).unwrap();
            store.put_record(record.clone()).unwrap();
        }

        let loaded = load_record(&path, &record.id.to_string()).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_record_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        assert!(matches!(
            load_record(&path, &RecordId::new().to_string()),
            Err(CliError::NotFound(_))
        ));
        // Nothing was created by the failed lookup
        assert!(!path.exists());

        SqliteRecordStore::new(&path).unwrap();
        assert!(matches!(load_record(&path, "not-an-id"), Err(CliError::InvalidInput(_))));
        assert!(matches!(
            load_record(&path, &RecordId::new().to_string()),
            Err(CliError::NotFound(_))
        ));
    }
}
