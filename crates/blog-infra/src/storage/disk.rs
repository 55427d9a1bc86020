//! Local filesystem store, served publicly under a URL prefix.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use blog_core::domain::UploadedFile;
use blog_core::ports::{FileStore, StorageError};

use super::{check_key, generate_key};

/// Stores blobs as files below `root`.
pub struct LocalDiskStore {
    root: PathBuf,
    public_url: String,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStore for LocalDiskStore {
    async fn put(&self, namespace: &str, file: &UploadedFile) -> Result<String, StorageError> {
        let key = generate_key(namespace, file);
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(%key, path = %path.display(), "Blob written");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> bool {
        match self.path_for(key) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("blog-disk-store-{}-{}", name, uuid::Uuid::new_v4()))
    }

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: "photo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"\x89PNG fake".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let root = scratch_root("crud");
        let store = LocalDiskStore::new(&root, "/storage/");

        let key = store.put("blog", &png()).await.unwrap();
        assert!(root.join(&key).is_file());
        assert!(store.exists(&key).await);
        assert_eq!(store.get(&key).await.unwrap(), Some(png().bytes));
        assert_eq!(store.url(&key), format!("/storage/{}", key));

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await);
        assert_eq!(store.get(&key).await.unwrap(), None);

        // deleting twice is fine
        store.delete(&key).await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_traversal_key_is_rejected() {
        let store = LocalDiskStore::new(scratch_root("traversal"), "/storage");

        assert!(matches!(
            store.get("../secret").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.delete("/etc/passwd").await.is_err());
        assert!(!store.exists("..").await);
    }
}
