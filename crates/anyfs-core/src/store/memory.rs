use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::object::ObjectId;
use super::provider::{ObjectProvider, ProviderError};

/// In-memory, HashMap-based provider.
///
/// Intended for tests and embedding. Ids are decimal counters and are never
/// reissued, even after deletion. A provider built with
/// [`without_delete`](Self::without_delete) behaves like a backend that cannot
/// reclaim storage.
pub struct InMemoryProvider {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
    next_id: AtomicU64,
    supports_delete: bool,
    reads: AtomicU64,
}

impl InMemoryProvider {
    /// Create a new empty provider that supports deletion.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            supports_delete: true,
            reads: AtomicU64::new(0),
        }
    }

    /// Create a new empty provider whose deletions always report `false`.
    pub fn without_delete() -> Self {
        Self {
            supports_delete: false,
            ..Self::new()
        }
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns `true` if the provider holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Check whether an object exists.
    pub async fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().await.contains_key(id)
    }

    /// Raw stored blob for an object, as the backend sees it.
    pub async fn raw_blob(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.objects.read().await.get(id).cloned()
    }

    /// Number of `read_object` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectProvider for InMemoryProvider {
    async fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, ProviderError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.objects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    async fn write_object(&self, id: &ObjectId, data: &[u8]) -> Result<(), ProviderError> {
        let mut objects = self.objects.write().await;
        match objects.get_mut(id) {
            Some(slot) => {
                slot.clear();
                slot.extend_from_slice(data);
                Ok(())
            }
            None => Err(ProviderError::NotFound(id.clone())),
        }
    }

    async fn create_object(&self) -> Result<ObjectId, ProviderError> {
        let id = ObjectId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.objects.write().await.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn delete_object(&self, id: &ObjectId) -> Result<bool, ProviderError> {
        if !self.supports_delete {
            return Ok(false);
        }
        Ok(self.objects.write().await.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProvider")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("supports_delete", &self.supports_delete)
            .finish_non_exhaustive()
    }
}
