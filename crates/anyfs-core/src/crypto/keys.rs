#![forbid(unsafe_code)]

use std::fmt;

use rand::RngCore;
use zeroize::Zeroizing;

use super::CryptoError;

/// Size of the object encryption key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Symmetric key used to encrypt every object of one filesystem instance.
///
/// The key is fixed for the lifetime of the filesystem. Its bytes are held in
/// a [`Zeroizing`] container so they are wiped when the key is dropped, and
/// they are only reachable through the scoped [`with_key`](Self::with_key)
/// accessor.
///
/// # Thread Safety
///
/// `ObjectKey` is immutable after construction and is shared across tasks via
/// `Arc<ObjectKey>`.
pub struct ObjectKey {
    bytes: Zeroizing<[u8; KEY_SIZE]>,
}

impl ObjectKey {
    /// Create a key from raw key material.
    ///
    /// The caller is responsible for zeroing the original array if it holds
    /// sensitive data.
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Generate a new random key using a cryptographically secure RNG.
    pub fn random() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        rand::rng().fill_bytes(&mut *bytes);
        Self { bytes }
    }

    /// Create a key from a byte slice, which must be exactly [`KEY_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self::new(array))
    }

    /// Execute a function with access to the raw key bytes.
    ///
    /// The key material never escapes this call; the callback cannot store a
    /// reference to it.
    pub fn with_key<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; KEY_SIZE]) -> R,
    {
        f(&self.bytes)
    }
}

impl Clone for ObjectKey {
    fn clone(&self) -> Self {
        Self::new(*self.bytes)
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKey").field("bytes", &"[REDACTED]").finish()
    }
}
