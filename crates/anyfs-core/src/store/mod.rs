//! Object storage: the logical object model, the decoded-object cache and
//! the provider boundary.

pub mod cache;
pub(crate) mod layered;
pub mod local;
pub mod memory;
pub mod object;
pub mod provider;

// Re-export commonly used types
pub use cache::{CacheStats, ObjectCache};
pub use local::LocalDirProvider;
pub use memory::InMemoryProvider;
pub use object::{
    EntryKind, FileMetadata, FolderEntry, FolderMetadata, Metadata, ObjectId, ObjectKind,
    StoredObject,
};
pub use provider::{ObjectProvider, ProviderError};
