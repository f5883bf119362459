//! Cryptographic primitives for encrypted object storage

pub mod codec;
pub mod keys;

use thiserror::Error;

/// Errors that can occur while constructing key material.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Array conversion failed due to unexpected length.
    ///
    /// **[PROGRAMMING ERROR]** Key material handed to the filesystem has the wrong size.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

// Re-export commonly used types
pub use codec::{CodecError, IV_SIZE, ObjectCodec};
pub use keys::{KEY_SIZE, ObjectKey};
