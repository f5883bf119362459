//! The filesystem model: files, folders and the namespace built on the
//! object store.

pub mod chunk;
pub mod file;
pub mod filesystem;
pub mod folder;
pub mod node;
pub mod path;

pub use chunk::FileChunk;
pub use file::{File, FileStat};
pub use filesystem::FileSystem;
pub use folder::Folder;
pub use node::Node;
