//! Filesystem instance: root bootstrap and entry points.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::folder::Folder;
use super::node::Node;
use super::path;
use crate::access::{AccessScheduler, Reader, SchedulerSnapshot, Writer};
use crate::config::FsConfig;
use crate::crypto::{CodecError, ObjectCodec, ObjectKey};
use crate::error::{FsContext, FsError, FsResult};
use crate::store::cache::CacheStats;
use crate::store::layered::LayeredStore;
use crate::store::object::{EntryKind, Metadata, ObjectId, StoredObject};
use crate::store::provider::{ObjectProvider, ProviderError};

struct FsInner {
    store: Arc<LayeredStore>,
    scheduler: Arc<AccessScheduler>,
    config: FsConfig,
    root_id: ObjectId,
}

/// An encrypted, chunked filesystem stored in an [`ObjectProvider`].
///
/// Cloning is cheap; clones share the cache and the scheduler, so they are the
/// same instance.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use anyfs_core::{FileSystem, FsConfig, InMemoryProvider, ObjectKey};
///
/// # async fn example() -> anyfs_core::FsResult<()> {
/// let fs = FileSystem::create(
///     Arc::new(InMemoryProvider::new()),
///     ObjectKey::random(),
///     FsConfig::default(),
/// )
/// .await?;
/// let root = fs.root().await?;
/// let docs = root.create_folder("docs").await?;
/// let file = docs.create_file("hello.txt").await?;
/// file.write_all(b"hello").await?;
/// assert_eq!(file.read_all().await?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<FsInner>,
}

impl FileSystem {
    /// Open the filesystem whose root folder is `root_id`.
    ///
    /// The root folder is created lazily by [`root`](Self::root) if it was
    /// never written.
    #[instrument(
        level = "debug",
        skip(provider, key),
        fields(root = %root_id, chunk_size = config.chunk_size)
    )]
    pub fn open(
        provider: Arc<dyn ObjectProvider>,
        key: ObjectKey,
        config: FsConfig,
        root_id: ObjectId,
    ) -> FsResult<Self> {
        config.validate()?;
        if root_id.is_empty() {
            return Err(FsError::Config {
                reason: "root object id is empty".to_string(),
            });
        }
        let codec = ObjectCodec::new(Arc::new(key));
        debug!("Opened filesystem");
        Ok(Self {
            inner: Arc::new(FsInner {
                store: Arc::new(LayeredStore::new(provider, codec)),
                scheduler: Arc::new(AccessScheduler::new()),
                config,
                root_id,
            }),
        })
    }

    /// Create a new filesystem with an empty root folder.
    ///
    /// The caller must persist [`root_id`](Self::root_id) to open it again.
    #[instrument(level = "info", skip(provider, key), fields(chunk_size = config.chunk_size))]
    pub async fn create(
        provider: Arc<dyn ObjectProvider>,
        key: ObjectKey,
        config: FsConfig,
    ) -> FsResult<Self> {
        config.validate()?;
        let root_id = provider
            .create_object()
            .await
            .map_err(|source| FsError::Provider {
                source,
                context: FsContext::new().with_path(path::ROOT_NAME),
            })?;
        let fs = Self::open(provider, key, config, root_id)?;

        let writer = fs.writer().await;
        let result = writer
            .write_object(fs.root_id(), &StoredObject::empty_folder())
            .await;
        writer.release()?;
        result?;

        info!(root = %fs.root_id(), "Created filesystem");
        Ok(fs)
    }

    /// Id of the root folder object.
    pub fn root_id(&self) -> &ObjectId {
        &self.inner.root_id
    }

    pub fn config(&self) -> &FsConfig {
        &self.inner.config
    }

    pub fn chunk_size(&self) -> usize {
        self.inner.config.chunk_size
    }

    /// Acquire shared read access to the whole object graph.
    pub async fn reader(&self) -> Reader {
        let guard = self.inner.scheduler.acquire_read().await;
        Reader::new(Arc::clone(&self.inner.store), guard)
    }

    /// Acquire exclusive write access to the whole object graph.
    pub async fn writer(&self) -> Writer {
        let guard = self.inner.scheduler.acquire_write().await;
        Writer::new(Arc::clone(&self.inner.store), guard)
    }

    /// The root folder, initializing it if it was never written.
    ///
    /// Only a missing root is initialized; a root that fails to decrypt is
    /// reported as corrupt and left untouched.
    #[instrument(level = "debug", skip(self), fields(root = %self.root_id()))]
    pub async fn root(&self) -> FsResult<Folder> {
        let reader = self.reader().await;
        let result = reader.read_object(self.root_id()).await;
        reader.release()?;

        match result {
            Ok(object) => self.check_root(&object)?,
            Err(err) if is_absent(&err) => {
                let writer = self.writer().await;
                let result = self.initialize_root(&writer).await;
                writer.release()?;
                result?;
            }
            Err(err) => return Err(err),
        }
        Ok(Folder::root(self.clone()))
    }

    async fn initialize_root(&self, writer: &Writer) -> FsResult<()> {
        // Another writer may have initialized it while we waited
        match writer.read_object(self.root_id()).await {
            Ok(object) => self.check_root(&object),
            Err(err) if is_absent(&err) => {
                writer
                    .write_object(self.root_id(), &StoredObject::empty_folder())
                    .await?;
                info!(root = %self.root_id(), "Initialized root folder");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn check_root(&self, object: &StoredObject) -> FsResult<()> {
        match object.metadata {
            Metadata::Folder(_) => Ok(()),
            ref other => Err(FsError::corrupt_structure(
                format!("root object is a {}, not a folder", other.kind()),
                FsContext::new()
                    .with_object(self.root_id())
                    .with_path(path::ROOT_NAME),
            )),
        }
    }

    /// Resolve a path from the root. See [`Folder::at_path`].
    pub async fn at_path(&self, path: &str) -> FsResult<Option<Node>> {
        self.root().await?.at_path(path).await
    }

    /// Move the entry at `source` to `dest`, under a single writer.
    ///
    /// The object keeps its id: `dest` is linked to it (replacing an existing
    /// file entry) and then `source` is unlinked. Renaming an entry onto
    /// itself does nothing.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `source` or the parent of `dest` is missing
    /// - [`FsError::IsADirectory`] if `dest` names an existing folder
    /// - [`FsError::InvalidName`] if `dest` has a reserved name or a folder
    ///   would be moved into itself
    #[instrument(level = "debug", skip(self))]
    pub async fn rename(&self, source: &str, dest: &str) -> FsResult<()> {
        let root = self.root().await?;
        let writer = self.writer().await;
        let result = self.rename_with(&writer, &root, source, dest).await;
        writer.release()?;
        result
    }

    async fn rename_with(
        &self,
        writer: &Writer,
        root: &Folder,
        source: &str,
        dest: &str,
    ) -> FsResult<()> {
        let (source_parent, source_name) =
            root.parent_for_path_with(writer, source, Some(true)).await?;
        let (dest_parent, dest_name) = root.parent_for_path_with(writer, dest, None).await?;

        if source_parent.id() == dest_parent.id() && source_name == dest_name {
            return Ok(());
        }

        let entry = source_parent
            .metadata_with(writer)
            .await?
            .entry(&source_name)
            .cloned()
            .ok_or_else(|| {
                FsError::not_found(FsContext::new().with_path(source).with_name(&source_name))
            })?;

        if entry.kind == EntryKind::Folder
            && (dest_parent.id() == &entry.object_id
                || dest_parent.ancestors().any(|f| f.id() == &entry.object_id))
        {
            return Err(FsError::InvalidName {
                name: dest.to_string(),
                reason: "cannot move a folder into itself",
            });
        }

        dest_parent
            .link_with(writer, &dest_name, entry.kind, entry.object_id.clone(), true)
            .await?;
        source_parent
            .delete_entry_with(writer, &source_name, true)
            .await?;
        debug!(source, dest, id = %entry.object_id, "Renamed entry");
        Ok(())
    }

    /// Hit, miss and size counters of the object cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.store.cache_stats()
    }

    /// Current state of the access scheduler.
    pub fn scheduler_snapshot(&self) -> SchedulerSnapshot {
        self.inner.scheduler.snapshot()
    }
}

/// An object that was never written, or never minted, counts as absent.
fn is_absent(err: &FsError) -> bool {
    matches!(
        err,
        FsError::Provider {
            source: ProviderError::NotFound(_),
            ..
        } | FsError::Corrupt {
            source: CodecError::EmptyBlob,
            ..
        }
    )
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("root_id", &self.inner.root_id)
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}
