//! Reader and writer handles over the object store.
//!
//! A handle pairs an [`AccessGuard`] with the store it guards. Every object
//! read or write of the filesystem goes through one of these handles, which is
//! what lets the scheduler's exclusion also protect the object cache.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::scheduler::{AccessGuard, AccessMode};
use crate::error::{FsContext, FsError, FsResult};
use crate::store::layered::{LayerError, LayeredStore};
use crate::store::object::{ObjectId, StoredObject};

#[derive(Debug)]
struct HandleState {
    guard: Option<AccessGuard>,
    reads_in_flight: usize,
    writes_in_flight: usize,
}

#[derive(Debug, Clone, Copy)]
enum OpKind {
    Read,
    Write,
}

/// Decrements the matching in-flight counter when the operation ends, however
/// it ends.
struct InFlight<'a> {
    state: &'a Mutex<HandleState>,
    kind: OpKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.kind {
            OpKind::Read => state.reads_in_flight -= 1,
            OpKind::Write => state.writes_in_flight -= 1,
        }
    }
}

fn layer_error(err: LayerError, id: &ObjectId) -> FsError {
    let context = FsContext::new().with_object(id);
    match err {
        LayerError::Provider(source) => FsError::Provider { source, context },
        LayerError::Codec(source) => FsError::Corrupt { source, context },
    }
}

/// Shared read access to the object graph.
///
/// Obtained from [`FileSystem::reader`](crate::FileSystem::reader). The access
/// is held until [`release`](Self::release) is called or the handle is
/// dropped, whichever comes first.
pub struct Reader {
    store: Arc<LayeredStore>,
    state: Mutex<HandleState>,
}

impl Reader {
    pub(crate) fn new(store: Arc<LayeredStore>, guard: AccessGuard) -> Self {
        Self {
            store,
            state: Mutex::new(HandleState {
                guard: Some(guard),
                reads_in_flight: 0,
                writes_in_flight: 0,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, kind: OpKind) -> FsResult<InFlight<'_>> {
        let mut state = self.lock_state();
        if state.guard.is_none() {
            return Err(FsError::InvalidatedHandle {
                reason: "handle has already been released",
            });
        }
        match kind {
            OpKind::Read => state.reads_in_flight += 1,
            OpKind::Write => state.writes_in_flight += 1,
        }
        Ok(InFlight {
            state: &self.state,
            kind,
        })
    }

    /// The kind of access this handle holds, or `None` once released.
    pub fn mode(&self) -> Option<AccessMode> {
        self.lock_state().guard.as_ref().map(AccessGuard::mode)
    }

    /// Whether the handle still holds its access.
    pub fn is_active(&self) -> bool {
        self.lock_state().guard.is_some()
    }

    /// Read the latest known value of an object.
    ///
    /// Returns an owned copy; mutating it affects nobody else.
    pub async fn read_object(&self, id: &ObjectId) -> FsResult<StoredObject> {
        if id.is_empty() {
            return Err(FsError::Usage {
                reason: "read of an empty object id".to_string(),
            });
        }
        let _op = self.begin(OpKind::Read)?;
        self.store.load(id).await.map_err(|e| layer_error(e, id))
    }

    /// Give the access back to the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidatedHandle`] if an operation on this handle is
    /// still in flight, or if the handle was already released. In both cases
    /// the scheduler state is left untouched.
    pub fn release(&self) -> FsResult<()> {
        let guard = {
            let mut state = self.lock_state();
            if state.reads_in_flight > 0 || state.writes_in_flight > 0 {
                return Err(FsError::InvalidatedHandle {
                    reason: "release with operations still in flight",
                });
            }
            state.guard.take().ok_or(FsError::InvalidatedHandle {
                reason: "handle has already been released",
            })?
        };
        drop(guard);
        Ok(())
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

/// Exclusive read-write access to the object graph.
///
/// A writer can do everything a [`Reader`] can and dereferences to one.
pub struct Writer {
    reader: Reader,
}

impl Writer {
    pub(crate) fn new(store: Arc<LayeredStore>, guard: AccessGuard) -> Self {
        Self {
            reader: Reader::new(store, guard),
        }
    }

    /// Encrypt and persist an object.
    ///
    /// The cache then holds the value a later decode of the stored blob
    /// produces, not the argument itself.
    pub async fn write_object(&self, id: &ObjectId, object: &StoredObject) -> FsResult<()> {
        if id.is_empty() {
            return Err(FsError::Usage {
                reason: "write to an empty object id".to_string(),
            });
        }
        let _op = self.reader.begin(OpKind::Write)?;
        self.reader
            .store
            .store(id, object)
            .await
            .map_err(|e| layer_error(e, id))
    }

    /// Mint a fresh object id. Nothing is cached until it is written.
    pub async fn create_object(&self) -> FsResult<ObjectId> {
        let _op = self.reader.begin(OpKind::Write)?;
        self.reader
            .store
            .create()
            .await
            .map_err(|source| FsError::Provider {
                source,
                context: FsContext::new(),
            })
    }

    /// Delete an object if the provider supports deletion.
    ///
    /// Returns `false` when the provider kept the object; it then remains as
    /// unreachable garbage.
    pub async fn delete_object(&self, id: &ObjectId) -> FsResult<bool> {
        let _op = self.reader.begin(OpKind::Write)?;
        let deleted = self
            .reader
            .store
            .delete(id)
            .await
            .map_err(|source| FsError::Provider {
                source,
                context: FsContext::new().with_object(id),
            })?;
        if deleted {
            debug!(%id, "Deleted object");
        } else {
            warn!(%id, "Provider did not delete object; it remains as garbage");
        }
        Ok(deleted)
    }
}

impl Deref for Writer {
    type Target = Reader;

    fn deref(&self) -> &Reader {
        &self.reader
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("reader", &self.reader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::scheduler::AccessScheduler;
    use crate::crypto::{ObjectCodec, ObjectKey};
    use crate::store::memory::InMemoryProvider;

    fn store() -> Arc<LayeredStore> {
        let codec = ObjectCodec::new(Arc::new(ObjectKey::new([3u8; 32])));
        Arc::new(LayeredStore::new(Arc::new(InMemoryProvider::new()), codec))
    }

    #[tokio::test]
    async fn test_writer_roundtrip_through_reader() {
        let scheduler = Arc::new(AccessScheduler::new());
        let store = store();

        let writer = Writer::new(store.clone(), scheduler.acquire_write().await);
        let id = writer.create_object().await.unwrap();
        writer
            .write_object(&id, &StoredObject::chunk(b"hello".to_vec()))
            .await
            .unwrap();
        writer.release().unwrap();

        let reader = Reader::new(store, scheduler.acquire_read().await);
        let object = reader.read_object(&id).await.unwrap();
        assert_eq!(object.data.as_deref(), Some(&b"hello"[..]));
        reader.release().unwrap();
        assert!(scheduler.snapshot().is_idle());
    }

    #[tokio::test]
    async fn test_released_handle_is_invalidated() {
        let scheduler = Arc::new(AccessScheduler::new());
        let writer = Writer::new(store(), scheduler.acquire_write().await);
        assert_eq!(writer.mode(), Some(AccessMode::Write));
        writer.release().unwrap();

        assert!(!writer.is_active());
        assert!(matches!(
            writer.create_object().await,
            Err(FsError::InvalidatedHandle { .. })
        ));
        assert!(matches!(
            writer.read_object(&ObjectId::new("1")).await,
            Err(FsError::InvalidatedHandle { .. })
        ));
        assert!(matches!(
            writer.release(),
            Err(FsError::InvalidatedHandle { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_id_is_usage_error() {
        let scheduler = Arc::new(AccessScheduler::new());
        let reader = Reader::new(store(), scheduler.acquire_read().await);
        assert!(matches!(
            reader.read_object(&ObjectId::new("")).await,
            Err(FsError::Usage { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_object_is_provider_not_found() {
        let scheduler = Arc::new(AccessScheduler::new());
        let reader = Reader::new(store(), scheduler.acquire_read().await);
        let err = reader.read_object(&ObjectId::new("77")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_drop_releases_access() {
        let scheduler = Arc::new(AccessScheduler::new());
        let writer = Writer::new(store(), scheduler.acquire_write().await);
        assert!(scheduler.snapshot().writer_active);
        drop(writer);
        assert!(scheduler.snapshot().is_idle());
    }
}
