//! Local directory provider: one file per object.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument, trace};

use super::object::ObjectId;
use super::provider::{ObjectProvider, ProviderError};

/// Largest id handed out, kept within the exactly representable range of a
/// double so ids stay stable through any JSON tooling.
const MAX_OBJECT_ID: u64 = (1 << 53) - 1;

/// Provider storing each object as a file named by its decimal id.
///
/// `create_object` reserves a random id by writing an empty file, so
/// uniqueness holds across restarts as long as files are only removed through
/// [`delete_object`](ObjectProvider::delete_object).
#[derive(Debug, Clone)]
pub struct LocalDirProvider {
    root: PathBuf,
}

impl LocalDirProvider {
    /// Open a storage directory, creating it if it does not exist.
    #[instrument(level = "debug", skip(root), fields(root = %root.as_ref().display()))]
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!("Opened local storage directory");
        Ok(Self { root })
    }

    /// The storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> Result<PathBuf, ProviderError> {
        // Ids are minted as decimal numbers; anything else could escape the directory.
        if id.is_empty() || !id.as_str().bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProviderError::NotFound(id.clone()));
        }
        Ok(self.root.join(id.as_str()))
    }

    fn io_error(id: &ObjectId, source: io::Error) -> ProviderError {
        if source.kind() == io::ErrorKind::NotFound {
            ProviderError::NotFound(id.clone())
        } else {
            ProviderError::Io {
                id: id.clone(),
                source,
            }
        }
    }
}

#[async_trait]
impl ObjectProvider for LocalDirProvider {
    async fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, ProviderError> {
        let path = self.object_path(id)?;
        fs::read(&path).await.map_err(|e| Self::io_error(id, e))
    }

    async fn write_object(&self, id: &ObjectId, data: &[u8]) -> Result<(), ProviderError> {
        let path = self.object_path(id)?;
        fs::write(&path, data)
            .await
            .map_err(|e| Self::io_error(id, e))
    }

    async fn create_object(&self) -> Result<ObjectId, ProviderError> {
        loop {
            let candidate = ObjectId::from(rand::random_range(1..=MAX_OBJECT_ID));
            let path = self.object_path(&candidate)?;
            // create_new makes the reservation atomic against concurrent creators
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => {
                    trace!(id = %candidate, "Reserved object id");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(ProviderError::Io {
                        id: candidate,
                        source,
                    });
                }
            }
        }
    }

    async fn delete_object(&self, id: &ObjectId) -> Result<bool, ProviderError> {
        let path = self.object_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ProviderError::Io {
                id: id.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_write_read_delete() {
        let temp_dir = TempDir::new().unwrap();
        let provider = LocalDirProvider::open(temp_dir.path().join("objects"))
            .await
            .unwrap();

        let id = provider.create_object().await.unwrap();
        assert!(provider.root().join(id.as_str()).exists());
        assert!(provider.read_object(&id).await.unwrap().is_empty());

        provider.write_object(&id, b"payload").await.unwrap();
        assert_eq!(provider.read_object(&id).await.unwrap(), b"payload");

        assert!(provider.delete_object(&id).await.unwrap());
        assert!(!provider.delete_object(&id).await.unwrap());
        assert!(matches!(
            provider.read_object(&id).await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_numeric_ids() {
        let temp_dir = TempDir::new().unwrap();
        let provider = LocalDirProvider::open(temp_dir.path()).await.unwrap();
        let evil = ObjectId::new("../escape");
        assert!(matches!(
            provider.read_object(&evil).await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_created_ids_are_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let provider = LocalDirProvider::open(temp_dir.path()).await.unwrap();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..50 {
            assert!(ids.insert(provider.create_object().await.unwrap()));
        }
    }
}
