use crate::access::{Reader, Writer};
use crate::error::{FsContext, FsError, FsResult};
use crate::store::object::{Metadata, ObjectId, StoredObject};

/// One chunk object of a file's content.
///
/// A chunk belongs to exactly one file and never appears as a folder entry.
/// Its stored buffer may be longer than the part of it the file's `size`
/// covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    id: ObjectId,
}

impl FileChunk {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The chunk's stored payload.
    pub async fn read_with(&self, reader: &Reader) -> FsResult<Vec<u8>> {
        let object = reader.read_object(&self.id).await?;
        match object.metadata {
            Metadata::Data => Ok(object.data.unwrap_or_default()),
            other => Err(FsError::corrupt_structure(
                format!("expected a data chunk, found a {}", other.kind()),
                FsContext::new().with_object(&self.id),
            )),
        }
    }

    /// Replace the chunk's payload.
    pub async fn write_with(&self, writer: &Writer, payload: &[u8]) -> FsResult<()> {
        writer
            .write_object(&self.id, &StoredObject::chunk(payload.to_vec()))
            .await
    }
}
