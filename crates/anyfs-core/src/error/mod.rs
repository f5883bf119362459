//! Error types for the filesystem core
//!
//! This module provides the error type surfaced by every public operation and
//! the context structure carried by its variants for detailed messages.

use std::fmt;
use std::io;

use thiserror::Error;

// Re-export error types from submodules
pub use crate::crypto::CryptoError;
pub use crate::crypto::codec::CodecError;
pub use crate::store::object::ObjectId;
pub use crate::store::provider::ProviderError;

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Context for filesystem errors, providing debugging information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsContext {
    /// The object involved (if known)
    pub object_id: Option<ObjectId>,
    /// The entry name inside its folder (if known)
    pub name: Option<String>,
    /// The path being resolved (if known)
    pub path: Option<String>,
}

impl FsContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_object(mut self, id: &ObjectId) -> Self {
        self.object_id = Some(id.clone());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for FsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref path) = self.path {
            parts.push(format!("path '{path}'"));
        }
        if let Some(ref name) = self.name {
            parts.push(format!("entry '{name}'"));
        }
        if let Some(ref id) = self.object_id {
            let display_id = if id.as_str().chars().count() > 12 {
                format!("{}...", id.as_str().chars().take(12).collect::<String>())
            } else {
                id.to_string()
            };
            parts.push(format!("object {display_id}"));
        }

        if parts.is_empty() {
            write!(f, "(no context)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors surfaced by filesystem operations.
///
/// None of these are retried internally.
#[derive(Error, Debug)]
pub enum FsError {
    /// A path component or an object is missing.
    #[error("No such file or directory: {context}")]
    NotFound { context: FsContext },

    /// A file was found where a folder was required.
    #[error("Not a directory: {context}")]
    NotADirectory { context: FsContext },

    /// A folder was found where a file was required, or a folder would be replaced.
    #[error("Is a directory: {context}")]
    IsADirectory { context: FsContext },

    /// Linking without force onto an occupied name.
    #[error("File exists: {context}")]
    AlreadyExists { context: FsContext },

    /// Non-forced deletion of a populated folder.
    #[error("Directory not empty: {context}")]
    DirectoryNotEmpty { context: FsContext },

    /// Reserved name (`.`, `..`), empty name, or embedded separator.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The stored blob could not be decoded.
    ///
    /// **[INTEGRITY VIOLATION]** Wrong key, corrupted ciphertext or unknown object type.
    #[error("Corrupt object for {context}: {source}")]
    Corrupt {
        #[source]
        source: CodecError,
        context: FsContext,
    },

    /// The object decoded but does not fit where it is referenced.
    #[error("Corrupt object structure for {context}: {reason}")]
    CorruptStructure { reason: String, context: FsContext },

    /// Operation on a released handle, or release with operations in flight.
    ///
    /// **[PROGRAMMING ERROR]**
    #[error("Invalidated handle: {reason}")]
    InvalidatedHandle { reason: &'static str },

    /// Invalid arguments such as overflowing offsets or empty object ids.
    ///
    /// **[PROGRAMMING ERROR]**
    #[error("Usage error: {reason}")]
    Usage { reason: String },

    /// The provider failed; surfaced unchanged.
    #[error("Provider error for {context}: {source}")]
    Provider {
        #[source]
        source: ProviderError,
        context: FsContext,
    },

    /// Invalid filesystem configuration.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl FsError {
    pub(crate) fn not_found(context: FsContext) -> Self {
        FsError::NotFound { context }
    }

    pub(crate) fn corrupt_structure(reason: impl Into<String>, context: FsContext) -> Self {
        FsError::CorruptStructure {
            reason: reason.into(),
            context,
        }
    }

    /// Whether the error reports a missing object or path.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FsError::NotFound { .. }
                | FsError::Provider {
                    source: ProviderError::NotFound(_),
                    ..
                }
        )
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NotFound { .. } => io::ErrorKind::NotFound,
            FsError::Provider {
                source: ProviderError::NotFound(_),
                ..
            } => io::ErrorKind::NotFound,
            FsError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            FsError::IsADirectory { .. } => io::ErrorKind::IsADirectory,
            FsError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            FsError::DirectoryNotEmpty { .. } => io::ErrorKind::DirectoryNotEmpty,
            FsError::InvalidName { .. } | FsError::Usage { .. } | FsError::Config { .. } => {
                io::ErrorKind::InvalidInput
            }
            FsError::Corrupt { .. } | FsError::CorruptStructure { .. } => {
                io::ErrorKind::InvalidData
            }
            FsError::InvalidatedHandle { .. } | FsError::Provider { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display_empty() {
        assert_eq!(format!("{}", FsContext::new()), "(no context)");
    }

    #[test]
    fn test_context_display_full() {
        let context = FsContext::new()
            .with_path("/a/b.txt")
            .with_name("b.txt")
            .with_object(&ObjectId::new("1234567890abcdef"));
        let display = context.to_string();
        assert!(display.contains("path '/a/b.txt'"));
        assert!(display.contains("entry 'b.txt'"));
        assert!(display.contains("object 1234567890ab..."));
    }

    #[test]
    fn test_io_error_kinds() {
        let cases = [
            (
                FsError::not_found(FsContext::new()),
                io::ErrorKind::NotFound,
            ),
            (
                FsError::AlreadyExists {
                    context: FsContext::new(),
                },
                io::ErrorKind::AlreadyExists,
            ),
            (
                FsError::DirectoryNotEmpty {
                    context: FsContext::new(),
                },
                io::ErrorKind::DirectoryNotEmpty,
            ),
            (
                FsError::InvalidName {
                    name: "..".into(),
                    reason: "reserved name",
                },
                io::ErrorKind::InvalidInput,
            ),
            (
                FsError::Corrupt {
                    source: CodecError::Decryption,
                    context: FsContext::new(),
                },
                io::ErrorKind::InvalidData,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(io::Error::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_provider_not_found_counts_as_not_found() {
        let err = FsError::Provider {
            source: ProviderError::NotFound(ObjectId::new("9")),
            context: FsContext::new(),
        };
        assert!(err.is_not_found());
    }
}
