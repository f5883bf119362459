use async_trait::async_trait;
use thiserror::Error;

use super::object::ObjectId;

/// Errors reported by a storage provider.
///
/// The core never retries; whether a failure is transient is only known to
/// the provider and the adapter above the core.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider has no object with this id.
    #[error("object {0} not found in provider")]
    NotFound(ObjectId),

    /// I/O error from the underlying storage backend.
    #[error("provider I/O error for object {id}: {source}")]
    Io {
        id: ObjectId,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure.
    #[error("provider error: {0}")]
    Backend(String),
}

/// Backing store contract: opaque blobs addressed by provider-minted ids.
///
/// The store never interprets blob contents.
///
/// Implementations must satisfy:
/// - `create_object` never returns an id it has returned before.
/// - `write_object` is only called with ids returned by `create_object`.
/// - `read_object` fails with [`ProviderError::NotFound`] for unknown ids.
#[async_trait]
pub trait ObjectProvider: Send + Sync {
    /// Read the entire blob stored under `id`.
    async fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, ProviderError>;

    /// Replace the blob stored under `id`.
    async fn write_object(&self, id: &ObjectId, data: &[u8]) -> Result<(), ProviderError>;

    /// Mint a new, never-before-issued id.
    ///
    /// The content of the new object is irrelevant; it is overwritten by a
    /// `write_object` call before it is read.
    async fn create_object(&self) -> Result<ObjectId, ProviderError>;

    /// Delete an object if the backend can reclaim storage.
    ///
    /// Returns `true` if the object was deleted. The default implementation
    /// reports deletion as unsupported; unreachable objects then stay behind
    /// as garbage.
    async fn delete_object(&self, id: &ObjectId) -> Result<bool, ProviderError> {
        let _ = id;
        Ok(false)
    }
}
