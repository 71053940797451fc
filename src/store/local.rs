use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use catalog_engine::backend::{ByteSource, UrlSigner};
use catalog_engine::TransportError;
use tokio::fs;
use tracing::debug;

use super::object_key;

/// Object store laid out on disk as `root/bucket/key`.
///
/// Signing yields `file://` URLs, which is enough for local browsing and for
/// exercising the full query path without a cloud account.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// Maps a storage locator onto a path below the root.
    pub fn object_path(&self, locator: &str) -> Result<PathBuf, TransportError> {
        let key = object_key(locator);
        if key.is_empty() {
            return Err(TransportError::NotFound(locator.to_string()));
        }
        if !Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(TransportError::PermissionDenied(locator.to_string()));
        }
        Ok(self.root.join(key))
    }
}

fn io_error(locator: &str, err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::NotFound => TransportError::NotFound(locator.to_string()),
        ErrorKind::PermissionDenied => TransportError::PermissionDenied(locator.to_string()),
        _ => TransportError::from(err),
    }
}

#[async_trait]
impl UrlSigner for LocalObjectStore {
    async fn sign(&self, locator: &str) -> Result<String, TransportError> {
        let path = self.object_path(locator)?;
        let path = fs::canonicalize(&path)
            .await
            .map_err(|e| io_error(locator, e))?;
        let metadata = fs::metadata(&path).await.map_err(|e| io_error(locator, e))?;
        if !metadata.is_file() {
            return Err(TransportError::NotFound(locator.to_string()));
        }

        debug!("signed {} as {}", locator, path.display());
        Ok(format!("file://{}", path.display()))
    }
}

#[async_trait]
impl ByteSource for LocalObjectStore {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError> {
        let path = match locator.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None => self.object_path(locator)?,
        };
        fs::read(&path).await.map_err(|e| io_error(locator, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (LocalObjectStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let photos = temp_dir.path().join("photos");
        fs::create_dir_all(photos.join("thumbnails")).await.unwrap();
        fs::write(photos.join("a.jpg"), b"jpeg").await.unwrap();
        fs::write(temp_dir.path().join("catalog.pb"), b"\x00").await.unwrap();
        (LocalObjectStore::new(temp_dir.path()), temp_dir)
    }

    #[tokio::test]
    async fn test_sign_and_fetch_object() {
        let (store, _temp_dir) = create_test_store().await;

        let url = store.sign("gs://photos/a.jpg").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("photos/a.jpg"));
        assert_eq!(store.fetch_bytes(&url).await.unwrap(), b"jpeg");
        assert_eq!(store.fetch_bytes("/catalog.pb").await.unwrap(), b"\x00");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (store, _temp_dir) = create_test_store().await;

        assert_eq!(
            store.sign("gs://photos/missing.jpg").await,
            Err(TransportError::NotFound("gs://photos/missing.jpg".to_string()))
        );
        assert!(matches!(
            store.fetch_bytes("/missing.pb").await,
            Err(TransportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_directories_and_traversal_are_rejected() {
        let (store, _temp_dir) = create_test_store().await;

        assert!(matches!(
            store.sign("gs://photos/thumbnails").await,
            Err(TransportError::NotFound(_))
        ));
        assert!(matches!(
            store.sign("gs://photos/../../etc/passwd").await,
            Err(TransportError::PermissionDenied(_))
        ));
        assert!(matches!(store.sign("").await, Err(TransportError::NotFound(_))));
    }
}
