//! Encrypted, chunked virtual filesystem over an abstract key-value object
//! store.
//!
//! Any backend that can read, write and mint objects by id (see
//! [`ObjectProvider`]) can host a hierarchical tree of files and folders.
//! Every object is encrypted with AES-256-CBC under one filesystem key, file
//! content is split into fixed-size chunk objects, and a write-biased
//! reader/writer scheduler makes every public operation atomic relative to
//! every other one.

pub mod access;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod store;

pub use access::{Reader, SchedulerSnapshot, Writer};
pub use config::FsConfig;
pub use crypto::ObjectKey;
pub use error::{FsContext, FsError, FsResult};
pub use fs::{File, FileStat, FileSystem, Folder, Node};
pub use store::{
    CacheStats, EntryKind, FolderEntry, InMemoryProvider, LocalDirProvider, ObjectId,
    ObjectProvider, ProviderError, StoredObject,
};
