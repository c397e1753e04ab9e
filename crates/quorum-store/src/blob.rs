//! Blob storage for uploads and processing archives
//!
//! Keys are `/`-separated relative paths such as
//! `voting_uploads/{session}/{file}`.

use crate::StoreError;
use quorum_domain::traits::BlobStore;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Reject keys that are empty, absolute, or climb out of the root
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    let path = Path::new(key);
    let all_normal = path.components().all(|c| matches!(c, Component::Normal(_)));
    if !all_normal {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Directory-backed blob store
///
/// Each key maps to a file under `root`; intermediate directories are created
/// on write.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    type Error = StoreError;

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!("Stored blob {} ({} bytes, {})", key, bytes.len(), content_type);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, Self::Error> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-process blob store
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Content type recorded for `key`
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|b| b.content_type.clone())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    type Error = StoreError;

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), Self::Error> {
        validate_key(key)?;
        self.lock().insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, Self::Error> {
        self.lock()
            .get(key)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
