use crate::domain::ports::ObjectStore;
use crate::utils::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Object store backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Keys are flat names; anything that could escape the base directory is
    /// rejected.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let invalid = key.is_empty()
            || key == "."
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0');
        if invalid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(Path::new(&self.base_path).join(key))
    }
}

fn not_found_or_io(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound {
            key: key.to_string(),
        }
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, content: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let full_path = self.resolve(key)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, &content).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let full_path = self.resolve(key)?;
        let data = tokio::fs::read(full_path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let full_path = self.resolve(key)?;
        tokio::fs::remove_file(full_path)
            .await
            .map_err(|e| not_found_or_io(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_reads_and_deletes() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().join("uploads"));

        store
            .put("a.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();
        assert_eq!(&store.get("a.txt").await.unwrap()[..], b"hello");

        store.delete("a.txt").await.unwrap();
        assert!(matches!(
            store.get("a.txt").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("a.txt").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_keys_that_escape_base_dir() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        for key in ["../etc/passwd", "nested/key.txt", "", ".."] {
            let err = store
                .put(key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey { .. }), "key {key:?}");
        }
    }
}
