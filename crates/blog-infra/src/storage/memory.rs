//! In-memory file store - used in tests and when no storage root is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use blog_core::domain::UploadedFile;
use blog_core::ports::{FileStore, StorageError};

use super::{check_key, generate_key};

/// Blob store backed by a `HashMap`.
///
/// Note: Data is lost on process restart.
pub struct InMemoryFileStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    public_url: String,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            public_url: "/storage".to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn put(&self, namespace: &str, file: &UploadedFile) -> Result<String, StorageError> {
        let key = generate_key(namespace, file);
        check_key(&key)?;

        self.blobs
            .write()
            .await
            .insert(key.clone(), file.bytes.clone());
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}
