//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the voting core and the
//! infrastructure it runs against. Implementations live in other crates.

use crate::{RecordId, RecordUpdate, StoredRecord};

/// A hosted vision model that turns an image plus a prompt into text
///
/// Implemented by the infrastructure layer (quorum-llm)
pub trait VisionProvider {
    /// Error type for extraction calls
    type Error;

    /// Send the image and prompt to `model_identity` and return its raw text
    fn extract(&self, image: &[u8], prompt: &str, model_identity: &str) -> Result<String, Self::Error>;
}

/// Lets a boxed trait object stand in wherever a concrete provider is expected
impl<T: VisionProvider + ?Sized> VisionProvider for Box<T> {
    type Error = T::Error;

    fn extract(&self, image: &[u8], prompt: &str, model_identity: &str) -> Result<String, Self::Error> {
        (**self).extract(image, prompt, model_identity)
    }
}

/// Storage for uploaded documents and processing archives
///
/// Keys are hierarchical path-like strings, unique per processing session.
/// Implemented by the infrastructure layer (quorum-store)
pub trait BlobStore {
    /// Error type for blob operations
    type Error;

    /// Store `bytes` under `key`
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), Self::Error>;

    /// Fetch the bytes stored under `key`
    fn get(&self, key: &str) -> Result<Vec<u8>, Self::Error>;
}

/// Storage for canonical records
///
/// Implemented by the infrastructure layer (quorum-store)
pub trait RecordStore {
    /// Error type for store operations
    type Error;

    /// Insert a new record
    fn put_record(&mut self, record: StoredRecord) -> Result<RecordId, Self::Error>;

    /// Get a record by ID
    fn get_record(&self, id: RecordId) -> Result<Option<StoredRecord>, Self::Error>;

    /// Apply a partial update; `None` when the record does not exist
    fn update_record(
        &mut self,
        id: RecordId,
        update: RecordUpdate,
    ) -> Result<Option<StoredRecord>, Self::Error>;
}
