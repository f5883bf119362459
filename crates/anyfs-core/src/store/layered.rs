//! The cache → codec → provider chain every handle reads and writes through.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::cache::{CacheStats, ObjectCache};
use super::object::{ObjectId, StoredObject};
use super::provider::{ObjectProvider, ProviderError};
use crate::crypto::{CodecError, ObjectCodec};

/// Failure of one layer of the chain, before context is attached.
#[derive(Debug)]
pub(crate) enum LayerError {
    Provider(ProviderError),
    Codec(CodecError),
}

/// Objects of one filesystem instance: the provider, the codec in front of
/// it and the cache in front of the codec.
///
/// This type performs no access control. It is only reachable through
/// [`Reader`](crate::access::Reader) and [`Writer`](crate::access::Writer)
/// handles, which is what makes the unsynchronized cache updates sound.
pub(crate) struct LayeredStore {
    provider: Arc<dyn ObjectProvider>,
    codec: ObjectCodec,
    cache: ObjectCache,
}

impl LayeredStore {
    pub(crate) fn new(provider: Arc<dyn ObjectProvider>, codec: ObjectCodec) -> Self {
        Self {
            provider,
            codec,
            cache: ObjectCache::new(),
        }
    }

    /// Latest known value of an object, decoding it on a cache miss.
    pub(crate) async fn load(&self, id: &ObjectId) -> Result<StoredObject, LayerError> {
        if let Some(object) = self.cache.get(id) {
            trace!(%id, "Object cache hit");
            return Ok(object);
        }
        trace!(%id, "Object cache miss");

        let blob = self
            .provider
            .read_object(id)
            .await
            .map_err(LayerError::Provider)?;
        let object = self.codec.decode(&blob).map_err(LayerError::Codec)?;
        self.cache.insert(id.clone(), object.clone());
        Ok(object)
    }

    /// Encrypt and persist an object, then publish its round-tripped value.
    pub(crate) async fn store(
        &self,
        id: &ObjectId,
        object: &StoredObject,
    ) -> Result<(), LayerError> {
        let sealed = self.codec.seal(object).map_err(LayerError::Codec)?;
        self.provider
            .write_object(id, &sealed.blob)
            .await
            .map_err(LayerError::Provider)?;
        debug!(%id, kind = %object.kind(), blob_len = sealed.blob.len(), "Wrote object");
        self.cache.insert(id.clone(), sealed.canonical);
        Ok(())
    }

    pub(crate) async fn create(&self) -> Result<ObjectId, ProviderError> {
        let id = self.provider.create_object().await?;
        debug!(%id, "Created object");
        Ok(id)
    }

    pub(crate) async fn delete(&self, id: &ObjectId) -> Result<bool, ProviderError> {
        self.provider.delete_object(id).await
    }

    pub(crate) fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl fmt::Debug for LayeredStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredStore")
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ObjectKey;
    use crate::store::memory::InMemoryProvider;
    use crate::store::object::FileMetadata;

    fn store_with(provider: Arc<InMemoryProvider>) -> LayeredStore {
        let codec = ObjectCodec::new(Arc::new(ObjectKey::new([7u8; 32])));
        LayeredStore::new(provider, codec)
    }

    #[tokio::test]
    async fn test_load_caches_decoded_object() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = store_with(provider.clone());

        let id = store.create().await.unwrap();
        store.store(&id, &StoredObject::chunk(b"abc".to_vec())).await.unwrap();

        // store() already published the value, so no provider read is needed
        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.data.as_deref(), Some(&b"abc"[..]));
        assert_eq!(provider.read_count(), 0);
        assert_eq!(store.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_load_miss_decodes_from_provider() {
        let provider = Arc::new(InMemoryProvider::new());
        let writer_side = store_with(provider.clone());
        let id = writer_side.create().await.unwrap();
        let meta = FileMetadata {
            chunks: vec![ObjectId::new("9")],
            size: 3,
        };
        writer_side.store(&id, &StoredObject::file(meta.clone())).await.unwrap();

        let fresh = store_with(provider.clone());
        let loaded = fresh.load(&id).await.unwrap();
        assert_eq!(loaded, StoredObject::file(meta));
        assert_eq!(provider.read_count(), 1);

        fresh.load(&id).await.unwrap();
        assert_eq!(provider.read_count(), 1);
    }

    #[tokio::test]
    async fn test_blob_is_encrypted() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = store_with(provider.clone());
        let id = store.create().await.unwrap();
        store
            .store(&id, &StoredObject::chunk(b"plain secret text".to_vec()))
            .await
            .unwrap();

        let blob = provider.raw_blob(&id).await.unwrap();
        assert!(!blob.windows(6).any(|w| w == b"secret"));
    }

    #[tokio::test]
    async fn test_never_written_object_is_empty_blob() {
        let provider = Arc::new(InMemoryProvider::new());
        let store = store_with(provider);
        let id = store.create().await.unwrap();
        assert!(matches!(
            store.load(&id).await,
            Err(LayerError::Codec(CodecError::EmptyBlob))
        ));
    }
}
