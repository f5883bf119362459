//! Folder handles and namespace operations.
//!
//! A [`Folder`] is an ephemeral view of one folder object. The authoritative
//! tree lives in the persisted entry lists; the in-memory `parent` link only
//! records how the handle was reached, for `..` and for absolute paths.
//!
//! Every public operation acquires exactly one reader or writer and releases
//! it before returning. The `*_with` variants run inside a handle the caller
//! already holds, which is how multi-step operations such as rename stay
//! atomic.

use std::fmt;
use std::iter;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::file::File;
use super::filesystem::FileSystem;
use super::node::Node;
use super::path;
use crate::access::{Reader, Writer};
use crate::error::{FsContext, FsError, FsResult};
use crate::store::object::{
    EntryKind, FolderEntry, FolderMetadata, Metadata, ObjectId, StoredObject,
};

/// Outcome of walking a path.
enum Walk {
    Found(Node),
    Missing,
    ThroughFile,
}

/// Handle to a folder in the namespace.
#[derive(Clone)]
pub struct Folder {
    fs: FileSystem,
    id: ObjectId,
    name: String,
    parent: Option<Arc<Folder>>,
}

impl Folder {
    pub(crate) fn root(fs: FileSystem) -> Self {
        Self {
            id: fs.root_id().clone(),
            fs,
            name: path::ROOT_NAME.to_string(),
            parent: None,
        }
    }

    fn child_node(&self, entry: &FolderEntry) -> Node {
        let parent = Arc::new(self.clone());
        match entry.kind {
            EntryKind::File => Node::File(File::new(
                self.fs.clone(),
                entry.object_id.clone(),
                entry.name.clone(),
                parent,
            )),
            EntryKind::Folder => Node::Folder(Self {
                fs: self.fs.clone(),
                id: entry.object_id.clone(),
                name: entry.name.clone(),
                parent: Some(parent),
            }),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Entry name of this folder, `/` for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The folder this handle was reached from. The root is its own parent.
    pub fn parent(&self) -> Folder {
        match &self.parent {
            Some(parent) => Folder::clone(parent),
            None => self.clone(),
        }
    }

    /// Folders above this one, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Folder> {
        iter::successors(self.parent.as_deref(), |folder| folder.parent.as_deref())
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    /// Absolute path of this folder, rebuilt from the parent links.
    pub fn absolute_path(&self) -> String {
        if self.is_root() {
            return path::ROOT_NAME.to_string();
        }
        let mut names: Vec<&str> = self
            .ancestors()
            .filter(|folder| !folder.is_root())
            .map(Folder::name)
            .collect();
        names.reverse();
        names.push(&self.name);
        format!("{}{}", path::ROOT_NAME, names.join("/"))
    }

    /// Last component of `path`.
    pub fn basename(path: &str) -> &str {
        path::basename(path)
    }

    // ---------------------------------------------------------------------
    // Handle-scoped operations
    // ---------------------------------------------------------------------

    pub(crate) async fn metadata_with(&self, reader: &Reader) -> FsResult<FolderMetadata> {
        let object = reader.read_object(&self.id).await?;
        match object.metadata {
            Metadata::Folder(metadata) => Ok(metadata),
            other => Err(FsError::corrupt_structure(
                format!("expected a folder, found a {}", other.kind()),
                FsContext::new().with_object(&self.id).with_name(&self.name),
            )),
        }
    }

    pub(crate) async fn get_with(&self, reader: &Reader, name: &str) -> FsResult<Option<Node>> {
        let metadata = self.metadata_with(reader).await?;
        Ok(metadata.entry(name).map(|entry| self.child_node(entry)))
    }

    async fn walk_with(
        &self,
        reader: &Reader,
        absolute: bool,
        components: &[&str],
    ) -> FsResult<Walk> {
        let mut current = if absolute && !self.is_root() {
            Folder::root(self.fs.clone())
        } else {
            self.clone()
        };

        for (index, component) in components.iter().enumerate() {
            match *component {
                "." => {}
                ".." => current = current.parent(),
                name => {
                    let next = current.get_with(reader, name).await?;
                    match next {
                        None => return Ok(Walk::Missing),
                        Some(Node::Folder(folder)) => current = folder,
                        Some(Node::File(file)) => {
                            if index + 1 == components.len() {
                                return Ok(Walk::Found(Node::File(file)));
                            }
                            return Ok(Walk::ThroughFile);
                        }
                    }
                }
            }
        }
        Ok(Walk::Found(Node::Folder(current)))
    }

    pub(crate) async fn at_path_with(&self, reader: &Reader, path: &str) -> FsResult<Option<Node>> {
        let components = path::components(path);
        match self.walk_with(reader, path::is_absolute(path), &components).await? {
            Walk::Found(node) => Ok(Some(node)),
            Walk::Missing | Walk::ThroughFile => Ok(None),
        }
    }

    pub(crate) async fn parent_for_path_with(
        &self,
        reader: &Reader,
        path: &str,
        should_exist: Option<bool>,
    ) -> FsResult<(Folder, String)> {
        let components = path::components(path);
        let Some((last, init)) = components.split_last() else {
            return Err(FsError::InvalidName {
                name: path.to_string(),
                reason: "path has no final component",
            });
        };
        let context = || FsContext::new().with_path(path);

        let parent = match self.walk_with(reader, path::is_absolute(path), init).await? {
            Walk::Found(Node::Folder(folder)) => folder,
            Walk::Found(Node::File(_)) | Walk::ThroughFile => {
                return Err(FsError::NotADirectory { context: context() });
            }
            Walk::Missing => return Err(FsError::not_found(context())),
        };

        if let Some(expected) = should_exist {
            let exists = parent.get_with(reader, last).await?.is_some();
            match (expected, exists) {
                (true, false) => return Err(FsError::not_found(context().with_name(*last))),
                (false, true) => {
                    return Err(FsError::AlreadyExists {
                        context: context().with_name(*last),
                    });
                }
                _ => {}
            }
        }
        Ok((parent, (*last).to_string()))
    }

    /// Register `name` for `object_id` in this folder.
    ///
    /// With `force`, an existing file entry of that name is unlinked first
    /// (its object is left alone). Folder entries are never replaced.
    pub async fn link_with(
        &self,
        writer: &Writer,
        name: &str,
        kind: EntryKind,
        object_id: ObjectId,
        force: bool,
    ) -> FsResult<()> {
        path::validate_name(name)?;
        let mut metadata = self.metadata_with(writer).await?;

        if let Some(position) = metadata.position(name) {
            let context = || FsContext::new().with_object(&self.id).with_name(name);
            if !force {
                return Err(FsError::AlreadyExists { context: context() });
            }
            if metadata.entries[position].kind == EntryKind::Folder {
                return Err(FsError::IsADirectory { context: context() });
            }
            metadata.entries.remove(position);
        }

        debug!(folder = %self.id, name, %kind, target = %object_id, "Linking entry");
        metadata
            .entries
            .push(FolderEntry::new(name, kind, object_id));
        writer
            .write_object(&self.id, &StoredObject::folder(metadata))
            .await
    }

    /// Remove `name` from this folder.
    ///
    /// Without `force`, a folder entry must be empty, and the entry's object
    /// (and a file's chunks) is deleted after the folder is persisted. With
    /// `force` only the entry goes; the object survives for a new link.
    pub async fn delete_entry_with(
        &self,
        writer: &Writer,
        name: &str,
        force: bool,
    ) -> FsResult<()> {
        let mut metadata = self.metadata_with(writer).await?;
        let context = || FsContext::new().with_object(&self.id).with_name(name);
        let position = metadata
            .position(name)
            .ok_or_else(|| FsError::not_found(context()))?;
        let entry = metadata.entries.remove(position);
        let target = self.child_node(&entry);

        if let Node::Folder(folder) = &target
            && !force
            && !folder.metadata_with(writer).await?.entries.is_empty()
        {
            return Err(FsError::DirectoryNotEmpty { context: context() });
        }

        writer
            .write_object(&self.id, &StoredObject::folder(metadata))
            .await?;
        debug!(folder = %self.id, name, force, "Unlinked entry");

        if !force {
            if let Node::File(file) = &target {
                file.truncate_with(writer).await?;
            }
            writer.delete_object(&entry.object_id).await?;
        }
        Ok(())
    }

    /// Allocate, initialize and link a new empty file or folder.
    pub async fn create_with(
        &self,
        writer: &Writer,
        name: &str,
        kind: EntryKind,
    ) -> FsResult<Node> {
        path::validate_name(name)?;
        if self.metadata_with(writer).await?.entry(name).is_some() {
            return Err(FsError::AlreadyExists {
                context: FsContext::new().with_object(&self.id).with_name(name),
            });
        }

        let object_id = writer.create_object().await?;
        let initial = match kind {
            EntryKind::File => StoredObject::empty_file(),
            EntryKind::Folder => StoredObject::empty_folder(),
        };
        writer.write_object(&object_id, &initial).await?;
        self.link_with(writer, name, kind, object_id.clone(), false)
            .await?;

        Ok(self.child_node(&FolderEntry::new(name, kind, object_id)))
    }

    // ---------------------------------------------------------------------
    // Public operations, one handle each
    // ---------------------------------------------------------------------

    /// Entries of this folder as currently persisted.
    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn list_contents(&self) -> FsResult<Vec<FolderEntry>> {
        let reader = self.fs.reader().await;
        let result = self.metadata_with(&reader).await;
        reader.release()?;
        Ok(result?.entries)
    }

    /// Look up an entry by exact, case-sensitive name.
    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn get(&self, name: &str) -> FsResult<Option<Node>> {
        let reader = self.fs.reader().await;
        let result = self.get_with(&reader, name).await;
        reader.release()?;
        result
    }

    pub async fn exists(&self, name: &str) -> FsResult<bool> {
        Ok(self.get(name).await?.is_some())
    }

    /// Resolve a `/`-separated path relative to this folder.
    ///
    /// Empty components are ignored, `.` stays put and `..` follows the
    /// in-memory parent link. A leading `/` resolves from the root. Returns
    /// `None` if a component is missing or a file is traversed past.
    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn at_path(&self, path: &str) -> FsResult<Option<Node>> {
        let reader = self.fs.reader().await;
        let result = self.at_path_with(&reader, path).await;
        reader.release()?;
        result
    }

    /// Resolve all but the last component of `path` to a folder.
    ///
    /// Returns that folder and the last component. With `should_exist`, the
    /// last component must (or must not) already be an entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if an intermediate component is missing, or
    ///   the last one is missing while `should_exist == Some(true)`
    /// - [`FsError::NotADirectory`] if an intermediate component is a file
    /// - [`FsError::AlreadyExists`] if the last component exists while
    ///   `should_exist == Some(false)`
    pub async fn parent_for_path(
        &self,
        path: &str,
        should_exist: Option<bool>,
    ) -> FsResult<(Folder, String)> {
        let reader = self.fs.reader().await;
        let result = self.parent_for_path_with(&reader, path, should_exist).await;
        reader.release()?;
        result
    }

    /// Register `name` for an existing object. See [`link_with`](Self::link_with).
    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn link(
        &self,
        name: &str,
        kind: EntryKind,
        object_id: ObjectId,
        force: bool,
    ) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.link_with(&writer, name, kind, object_id, force).await;
        writer.release()?;
        result
    }

    /// Remove an entry. See [`delete_entry_with`](Self::delete_entry_with).
    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn delete_entry(&self, name: &str, force: bool) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.delete_entry_with(&writer, name, force).await;
        writer.release()?;
        result
    }

    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn create_file(&self, name: &str) -> FsResult<File> {
        let writer = self.fs.writer().await;
        let result = self.create_with(&writer, name, EntryKind::File).await;
        writer.release()?;
        match result? {
            Node::File(file) => Ok(file),
            Node::Folder(_) => Err(FsError::corrupt_structure(
                "new file came back as a folder",
                FsContext::new().with_name(name),
            )),
        }
    }

    #[instrument(level = "debug", skip(self), fields(folder = %self.id))]
    pub async fn create_folder(&self, name: &str) -> FsResult<Folder> {
        let writer = self.fs.writer().await;
        let result = self.create_with(&writer, name, EntryKind::Folder).await;
        writer.release()?;
        match result? {
            Node::Folder(folder) => Ok(folder),
            Node::File(_) => Err(FsError::corrupt_structure(
                "new folder came back as a file",
                FsContext::new().with_name(name),
            )),
        }
    }
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Folder")
            .field("id", &self.id)
            .field("path", &self.absolute_path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;
    use crate::crypto::ObjectKey;
    use crate::store::memory::InMemoryProvider;

    async fn root() -> Folder {
        let fs = FileSystem::create(
            Arc::new(InMemoryProvider::new()),
            ObjectKey::new([9u8; 32]),
            FsConfig::default().with_chunk_size(8),
        )
        .await
        .unwrap();
        fs.root().await.unwrap()
    }

    #[tokio::test]
    async fn test_absolute_path_and_parent() {
        let root = root().await;
        let a = root.create_folder("a").await.unwrap();
        let b = a.create_folder("b").await.unwrap();

        assert_eq!(root.absolute_path(), "/");
        assert_eq!(a.absolute_path(), "/a");
        assert_eq!(b.absolute_path(), "/a/b");
        assert_eq!(b.parent().id(), a.id());
        assert_eq!(root.parent().id(), root.id());
        assert_eq!(b.ancestors().count(), 2);
    }

    #[tokio::test]
    async fn test_dot_dot_at_root_stays_at_root() {
        let root = root().await;
        let node = root.at_path("../..").await.unwrap().unwrap();
        assert_eq!(node.id(), root.id());
    }

    #[tokio::test]
    async fn test_absolute_path_from_subfolder_uses_root() {
        let root = root().await;
        let a = root.create_folder("a").await.unwrap();
        root.create_file("top.txt").await.unwrap();

        assert!(a.at_path("top.txt").await.unwrap().is_none());
        let node = a.at_path("/top.txt").await.unwrap().unwrap();
        assert!(node.is_file());
    }

    #[tokio::test]
    async fn test_traversing_past_file_is_absent() {
        let root = root().await;
        root.create_file("f").await.unwrap();
        assert!(root.at_path("f/x").await.unwrap().is_none());
        assert!(root.at_path("f/..").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_parent_for_path_checks() {
        let root = root().await;
        let a = root.create_folder("a").await.unwrap();
        a.create_file("f").await.unwrap();

        let (parent, name) = root.parent_for_path("/a/f", Some(true)).await.unwrap();
        assert_eq!(parent.id(), a.id());
        assert_eq!(name, "f");

        assert!(matches!(
            root.parent_for_path("/a/f", Some(false)).await,
            Err(FsError::AlreadyExists { .. })
        ));
        assert!(matches!(
            root.parent_for_path("/a/g", Some(true)).await,
            Err(FsError::NotFound { .. })
        ));
        assert!(matches!(
            root.parent_for_path("/a/f/g", None).await,
            Err(FsError::NotADirectory { .. })
        ));
        assert!(matches!(
            root.parent_for_path("/missing/g", None).await,
            Err(FsError::NotFound { .. })
        ));
        assert!(matches!(
            root.parent_for_path("/", None).await,
            Err(FsError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_and_duplicate_names() {
        let root = root().await;
        root.create_file("x").await.unwrap();
        assert!(matches!(
            root.create_folder("x").await,
            Err(FsError::AlreadyExists { .. })
        ));
        for bad in [".", "..", "a/b", ""] {
            assert!(matches!(
                root.create_file(bad).await,
                Err(FsError::InvalidName { .. })
            ));
        }
        assert!(root.file_system().scheduler_snapshot().is_idle());
    }

    #[tokio::test]
    async fn test_get_is_case_sensitive() {
        let root = root().await;
        root.create_file("Readme").await.unwrap();
        assert!(root.exists("Readme").await.unwrap());
        assert!(!root.exists("readme").await.unwrap());
    }

    #[test]
    fn test_basename() {
        assert_eq!(Folder::basename("/a/b/c.txt"), "c.txt");
    }
}
