use super::file::File;
use super::folder::Folder;
use crate::store::object::{EntryKind, ObjectId};

/// A namespace entry resolved to a handle.
#[derive(Debug, Clone)]
pub enum Node {
    File(File),
    Folder(Folder),
}

impl Node {
    pub fn id(&self) -> &ObjectId {
        match self {
            Node::File(file) => file.id(),
            Node::Folder(folder) => folder.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => file.name(),
            Node::Folder(folder) => folder.name(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Node::File(_) => EntryKind::File,
            Node::Folder(_) => EntryKind::Folder,
        }
    }

    pub fn absolute_path(&self) -> String {
        match self {
            Node::File(file) => file.absolute_path(),
            Node::Folder(folder) => folder.absolute_path(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder(_))
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Node::Folder(folder) => Some(folder),
            Node::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<File> {
        match self {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        }
    }

    pub fn into_folder(self) -> Option<Folder> {
        match self {
            Node::Folder(folder) => Some(folder),
            Node::File(_) => None,
        }
    }
}
