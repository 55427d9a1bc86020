//! File stores - local disk and in-memory fallback.

mod disk;
mod memory;

pub use disk::LocalDiskStore;
pub use memory::InMemoryFileStore;

use blog_core::domain::UploadedFile;
use blog_core::ports::StorageError;

/// Build a fresh key `{namespace}/{uuid}.{ext}` for an uploaded file.
pub(crate) fn generate_key(namespace: &str, file: &UploadedFile) -> String {
    let id = uuid::Uuid::new_v4().simple();
    match extension_for(file) {
        Some(ext) => format!("{}/{}.{}", namespace, id, ext),
        None => format!("{}/{}", namespace, id),
    }
}

fn extension_for(file: &UploadedFile) -> Option<String> {
    let from_name = std::path::Path::new(&file.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.or_else(|| {
        mime_guess::get_mime_extensions_str(&file.content_type)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
    })
}

/// Reject keys that could escape the storage root.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");

    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_key_keeps_lowercased_extension() {
        let key = generate_key("blog", &file("Holiday.PNG", "image/png"));

        assert!(key.starts_with("blog/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_key_falls_back_to_content_type() {
        let key = generate_key("blog", &file("blob", "image/png"));

        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_keys_are_unique() {
        let f = file("a.jpg", "image/jpeg");

        assert_ne!(generate_key("blog", &f), generate_key("blog", &f));
    }

    #[test]
    fn test_check_key_rejects_traversal() {
        assert!(check_key("blog/abc.png").is_ok());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("blog/../../x").is_err());
        assert!(check_key("/abs/path").is_err());
        assert!(check_key("blog\\x.png").is_err());
        assert!(check_key("blog//x.png").is_err());
        assert!(check_key("").is_err());
    }
}
