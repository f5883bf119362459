//! Logical object model stored behind the provider.
//!
//! Every object is a [`StoredObject`]: structured [`Metadata`] plus an optional
//! raw payload. Metadata is one of three shapes, distinguished by its `type`
//! tag when serialized:
//!
//! - `data` -- one file chunk; the chunk bytes live in the payload
//! - `file` -- ordered chunk ids plus the logical byte size
//! - `folder` -- ordered list of named entries

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque object identifier minted by the provider.
///
/// The core never interprets identifiers; it only stores them in metadata and
/// hands them back to the provider. Identifiers serialize as JSON strings.
/// Numeric identifiers written by older stores are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an identifier from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    /// Get the raw string representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty (never minted by a provider).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        ObjectId(value.to_string())
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        ObjectId(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        ObjectId(value)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ObjectId(text),
            RawId::Number(number) => ObjectId::from(number),
        })
    }
}

/// Kind of a namespace entry inside a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Folder => f.write_str("folder"),
        }
    }
}

/// One `name -> object` association in a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "objectID")]
    pub object_id: ObjectId,
}

impl FolderEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind, object_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind,
            object_id,
        }
    }
}

/// Metadata of a file object.
///
/// `size` is authoritative for the logical length; the last chunk's stored
/// payload may be longer than the logical tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub chunks: Vec<ObjectId>,
    pub size: u64,
}

/// Metadata of a folder object. Entry names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub entries: Vec<FolderEntry>,
}

impl FolderMetadata {
    /// Find an entry by exact, case-sensitive name.
    pub fn entry(&self, name: &str) -> Option<&FolderEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Position of an entry by exact, case-sensitive name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

/// Tagged object metadata. An unknown `type` tag fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Metadata {
    Data,
    File(FileMetadata),
    Folder(FolderMetadata),
}

/// Discriminant of [`Metadata`], used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Data,
    File,
    Folder,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Data => f.write_str("data"),
            ObjectKind::File => f.write_str("file"),
            ObjectKind::Folder => f.write_str("folder"),
        }
    }
}

impl Metadata {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Metadata::Data => ObjectKind::Data,
            Metadata::File(_) => ObjectKind::File,
            Metadata::Folder(_) => ObjectKind::Folder,
        }
    }
}

/// The unit of storage: metadata plus an optional raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub metadata: Metadata,
    pub data: Option<Vec<u8>>,
}

impl StoredObject {
    /// A file chunk carrying `bytes`.
    pub fn chunk(bytes: Vec<u8>) -> Self {
        Self {
            metadata: Metadata::Data,
            data: Some(bytes),
        }
    }

    pub fn file(metadata: FileMetadata) -> Self {
        Self {
            metadata: Metadata::File(metadata),
            data: None,
        }
    }

    pub fn folder(metadata: FolderMetadata) -> Self {
        Self {
            metadata: Metadata::Folder(metadata),
            data: None,
        }
    }

    /// An empty file: no chunks, size 0.
    pub fn empty_file() -> Self {
        Self::file(FileMetadata::default())
    }

    /// An empty folder: no entries.
    pub fn empty_folder() -> Self {
        Self::folder(FolderMetadata::default())
    }

    pub fn kind(&self) -> ObjectKind {
        self.metadata.kind()
    }
}
