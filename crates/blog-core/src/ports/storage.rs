//! File storage port.

use async_trait::async_trait;

use crate::domain::UploadedFile;

/// Namespace post illustrations are stored under.
pub const IMAGE_NAMESPACE: &str = "blog";

/// Blob store addressed by keys such as `blog/3f2a.png`.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store a file under `namespace` and return its key.
    async fn put(&self, namespace: &str, file: &UploadedFile) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> bool;

    /// Public URL the blob is served from.
    fn url(&self, key: &str) -> String;
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("I/O failure: {0}")]
    Io(String),
}
