//! Encrypted object codec.
//!
//! Converts a [`StoredObject`] to the opaque blob handed to the provider and
//! back.
//!
//! # Blob Format
//!
//! | Offset | Size | Description |
//! |--------|------|-------------|
//! | 0      | 16   | Random IV, fresh for every write |
//! | 16     | n    | AES-256-CBC (PKCS#7 padded) ciphertext of the plaintext |
//!
//! # Plaintext Format
//!
//! `metadata-json` when the object has no payload, otherwise
//! `metadata-json ++ 0x00 ++ payload`. JSON text never contains a raw NUL, so
//! the first NUL byte always separates metadata from payload.

use std::sync::Arc;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use thiserror::Error;
use tracing::{instrument, trace};
use zeroize::Zeroizing;

use super::keys::ObjectKey;
use crate::store::object::{Metadata, StoredObject};

/// IV size for AES-CBC (one block, 16 bytes)
pub const IV_SIZE: usize = 16;

/// Separator between metadata text and payload in the plaintext
const PAYLOAD_SEPARATOR: u8 = 0x00;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Error, Debug)]
pub enum CodecError {
    /// The blob is empty: the id was minted but never written.
    #[error("Object blob is empty (created but never written)")]
    EmptyBlob,

    /// The blob is too short to contain an IV.
    #[error("Object blob too short: expected at least 16 bytes, got {actual}")]
    TooShort { actual: usize },

    /// Decryption or padding removal failed.
    ///
    /// **[INTEGRITY VIOLATION]** Wrong key or corrupted ciphertext.
    #[error("Failed to decrypt object: wrong key or corrupted ciphertext")]
    Decryption,

    /// The metadata text is not valid JSON for a known object type.
    #[error("Malformed object metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    /// Metadata could not be serialized.
    #[error("Failed to serialize object metadata: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result of encoding an object for storage.
#[derive(Debug)]
pub struct SealedObject {
    /// `IV ++ ciphertext`, ready for the provider.
    pub blob: Vec<u8>,
    /// The object as a later [`ObjectCodec::decode`] of `blob` will see it.
    pub canonical: StoredObject,
}

/// Encrypts and decrypts objects under one fixed key.
#[derive(Debug, Clone)]
pub struct ObjectCodec {
    key: Arc<ObjectKey>,
}

impl ObjectCodec {
    pub fn new(key: Arc<ObjectKey>) -> Self {
        Self { key }
    }

    /// Encode an object into an encrypted blob.
    pub fn encode(&self, object: &StoredObject) -> Result<Vec<u8>, CodecError> {
        Ok(self.seal(object)?.blob)
    }

    /// Encode an object and also return its canonical (round-tripped) form.
    ///
    /// The canonical form is parsed from the exact plaintext that was
    /// encrypted, so it equals what decoding the blob yields.
    #[instrument(level = "trace", skip_all, fields(kind = %object.kind()))]
    pub fn seal(&self, object: &StoredObject) -> Result<SealedObject, CodecError> {
        let plaintext = Self::plaintext(object)?;

        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);

        let ciphertext = self.key.with_key(|key| {
            Aes256CbcEnc::new(key.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(&plaintext)
        });

        let mut blob = Vec::with_capacity(IV_SIZE + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        trace!(plaintext_len = plaintext.len(), blob_len = blob.len(), "Encrypted object");

        let canonical = Self::parse_plaintext(&plaintext)?;
        Ok(SealedObject { blob, canonical })
    }

    /// Decode an encrypted blob into an object.
    #[instrument(level = "trace", skip_all, fields(blob_len = blob.len()))]
    pub fn decode(&self, blob: &[u8]) -> Result<StoredObject, CodecError> {
        if blob.is_empty() {
            return Err(CodecError::EmptyBlob);
        }
        if blob.len() < IV_SIZE {
            return Err(CodecError::TooShort { actual: blob.len() });
        }
        let (iv_bytes, ciphertext) = blob.split_at(IV_SIZE);
        let iv: [u8; IV_SIZE] = iv_bytes
            .try_into()
            .map_err(|_| CodecError::TooShort { actual: blob.len() })?;

        let plaintext = self.key.with_key(|key| {
            Aes256CbcDec::new(key.into(), (&iv).into())
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map(Zeroizing::new)
                .map_err(|_| CodecError::Decryption)
        })?;

        Self::parse_plaintext(&plaintext)
    }

    fn plaintext(object: &StoredObject) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        let metadata = serde_json::to_vec(&object.metadata).map_err(CodecError::Serialize)?;
        let payload_len = object.data.as_ref().map_or(0, |data| data.len() + 1);
        let mut plaintext = Zeroizing::new(Vec::with_capacity(metadata.len() + payload_len));
        plaintext.extend_from_slice(&metadata);
        if let Some(data) = &object.data {
            plaintext.push(PAYLOAD_SEPARATOR);
            plaintext.extend_from_slice(data);
        }
        Ok(plaintext)
    }

    fn parse_plaintext(plaintext: &[u8]) -> Result<StoredObject, CodecError> {
        let separator = plaintext.iter().position(|&b| b == PAYLOAD_SEPARATOR);
        let metadata_bytes = match separator {
            Some(end) => &plaintext[..end],
            None => plaintext,
        };
        let metadata: Metadata =
            serde_json::from_slice(metadata_bytes).map_err(CodecError::Metadata)?;
        let data = separator.map(|end| plaintext[end + 1..].to_vec());
        Ok(StoredObject { metadata, data })
    }
}
