//! Chunked file content.
//!
//! A file object stores an ordered list of chunk ids and the logical `size`.
//! Chunk `i` covers bytes `[i * chunk_size, (i + 1) * chunk_size)`; only
//! `size` says how much of the last chunk is meaningful.
//!
//! Every content change ends with one write of the file object. That write is
//! the commit point: chunks written before it and never linked, or unlinked by
//! it and not yet deleted, are unreachable garbage rather than corruption.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::chunk::FileChunk;
use super::filesystem::FileSystem;
use super::folder::Folder;
use super::path;
use crate::access::{Reader, Writer};
use crate::error::{FsContext, FsError, FsResult};
use crate::store::object::{FileMetadata, Metadata, ObjectId, StoredObject};

/// Result of [`File::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Logical length in bytes.
    pub size: u64,
}

fn to_usize(value: u64, what: &str) -> FsResult<usize> {
    usize::try_from(value).map_err(|_| FsError::Usage {
        reason: format!("{what} of {value} bytes exceeds addressable memory"),
    })
}

/// Handle to a file in the namespace.
#[derive(Clone)]
pub struct File {
    fs: FileSystem,
    id: ObjectId,
    name: String,
    parent: Arc<Folder>,
}

impl File {
    pub(crate) fn new(fs: FileSystem, id: ObjectId, name: String, parent: Arc<Folder>) -> Self {
        Self {
            fs,
            id,
            name,
            parent,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The folder this handle was reached from.
    pub fn parent(&self) -> &Folder {
        &self.parent
    }

    pub fn absolute_path(&self) -> String {
        path::join(&self.parent.absolute_path(), &self.name)
    }

    fn chunk_size(&self) -> u64 {
        self.fs.chunk_size() as u64
    }

    fn context(&self) -> FsContext {
        FsContext::new().with_object(&self.id).with_name(&self.name)
    }

    // ---------------------------------------------------------------------
    // Handle-scoped operations
    // ---------------------------------------------------------------------

    pub(crate) async fn metadata_with(&self, reader: &Reader) -> FsResult<FileMetadata> {
        let object = reader.read_object(&self.id).await?;
        match object.metadata {
            Metadata::File(metadata) => Ok(metadata),
            other => Err(FsError::corrupt_structure(
                format!("expected a file, found a {}", other.kind()),
                self.context(),
            )),
        }
    }

    /// Read up to `length` bytes starting at `position`.
    ///
    /// The window is clamped to the file size, so reading at or past the end
    /// returns an empty buffer.
    pub async fn read_with(
        &self,
        reader: &Reader,
        position: u64,
        length: u64,
    ) -> FsResult<Vec<u8>> {
        let requested_end = position.checked_add(length).ok_or_else(|| FsError::Usage {
            reason: format!("read range {position}+{length} overflows"),
        })?;
        let metadata = self.metadata_with(reader).await?;
        let end = requested_end.min(metadata.size);
        if position >= end {
            return Ok(Vec::new());
        }

        let chunk_size = self.chunk_size();
        let first = position / chunk_size;
        let last = (end - 1) / chunk_size;
        let slot_len = to_usize(chunk_size, "chunk")?;
        let mut window = Vec::with_capacity(to_usize((last - first + 1) * chunk_size, "read")?);

        for index in first..=last {
            let slot_start = window.len();
            match metadata.chunks.get(to_usize(index, "chunk index")?) {
                Some(id) => window.extend(FileChunk::new(id.clone()).read_with(reader).await?),
                None => warn!(file = %self.id, index, "Chunk missing from file, zero-filling"),
            }
            // Stored payloads shorter or longer than a slot are normalized to it
            window.resize(slot_start + slot_len, 0);
        }

        let offset = to_usize(position - first * chunk_size, "read offset")?;
        let len = to_usize(end - position, "read")?;
        window.truncate(offset + len);
        window.drain(..offset);
        Ok(window)
    }

    /// Rewrite content from chunk `start_index` onwards with `data`.
    ///
    /// Existing chunk objects are overwritten in place, missing ones are
    /// created, and chunks past the new end are unlinked and then reclaimed.
    async fn write_chunks(
        &self,
        writer: &Writer,
        mut metadata: FileMetadata,
        start_index: usize,
        data: &[u8],
    ) -> FsResult<()> {
        if start_index > metadata.chunks.len() {
            return Err(FsError::corrupt_structure(
                format!(
                    "chunk rewrite starts at {start_index} but the file has {} chunks",
                    metadata.chunks.len()
                ),
                self.context(),
            ));
        }
        let chunk_size = to_usize(self.chunk_size(), "chunk")?;

        let mut index = start_index;
        let mut created = 0usize;
        for piece in data.chunks(chunk_size) {
            match metadata.chunks.get(index) {
                Some(id) => FileChunk::new(id.clone()).write_with(writer, piece).await?,
                None => {
                    let id = writer.create_object().await?;
                    FileChunk::new(id.clone()).write_with(writer, piece).await?;
                    metadata.chunks.push(id);
                    created += 1;
                }
            }
            index += 1;
        }

        let dropped = metadata.chunks.split_off(index);
        metadata.size = start_index as u64 * self.chunk_size() + data.len() as u64;
        debug!(
            file = %self.id,
            start_index,
            created,
            dropped = dropped.len(),
            size = metadata.size,
            "Rewrote file chunks"
        );
        writer
            .write_object(&self.id, &StoredObject::file(metadata))
            .await?;

        self.reclaim_chunks(writer, dropped).await;
        Ok(())
    }

    /// Delete chunk objects that the committed metadata no longer references.
    ///
    /// Failures only leave garbage behind, so they are logged and skipped.
    async fn reclaim_chunks(&self, writer: &Writer, chunks: Vec<ObjectId>) {
        for chunk in chunks {
            if let Err(err) = writer.delete_object(&chunk).await {
                warn!(file = %self.id, %chunk, error = %err, "Failed to reclaim chunk");
            }
        }
    }

    /// Append `data`, topping up the last chunk before allocating new ones.
    pub async fn append_with(&self, writer: &Writer, data: &[u8]) -> FsResult<()> {
        let metadata = self.metadata_with(writer).await?;
        let Some(last_index) = metadata.chunks.len().checked_sub(1) else {
            return self.write_chunks(writer, metadata, 0, data).await;
        };

        let chunk_size = self.chunk_size();
        let tail_len = metadata
            .size
            .saturating_sub(last_index as u64 * chunk_size)
            .min(chunk_size);
        let mut payload = FileChunk::new(metadata.chunks[last_index].clone())
            .read_with(writer)
            .await?;
        payload.resize(to_usize(tail_len, "chunk")?, 0);
        payload.extend_from_slice(data);

        self.write_chunks(writer, metadata, last_index, &payload)
            .await
    }

    /// Replace the whole content with `data`.
    pub async fn write_all_with(&self, writer: &Writer, data: &[u8]) -> FsResult<()> {
        let metadata = self.metadata_with(writer).await?;
        self.write_chunks(writer, metadata, 0, data).await
    }

    /// Empty the file and delete its chunk objects.
    pub async fn truncate_with(&self, writer: &Writer) -> FsResult<()> {
        let metadata = self.metadata_with(writer).await?;
        writer
            .write_object(&self.id, &StoredObject::empty_file())
            .await?;
        debug!(file = %self.id, chunks = metadata.chunks.len(), "Truncated file");
        self.reclaim_chunks(writer, metadata.chunks).await;
        Ok(())
    }

    /// Shrink the file to `size` bytes, or extend it with zero bytes.
    pub async fn set_len_with(&self, writer: &Writer, size: u64) -> FsResult<()> {
        let metadata = self.metadata_with(writer).await?;
        match size.cmp(&metadata.size) {
            Ordering::Equal => Ok(()),
            Ordering::Greater => {
                let extra = to_usize(size - metadata.size, "extension")?;
                self.append_with(writer, &vec![0u8; extra]).await
            }
            Ordering::Less if size == 0 => self.truncate_with(writer).await,
            Ordering::Less => {
                let chunk_size = self.chunk_size();
                let last_index = to_usize((size - 1) / chunk_size, "chunk index")?;
                let keep = to_usize(size - last_index as u64 * chunk_size, "chunk")?;
                let mut payload = match metadata.chunks.get(last_index) {
                    Some(id) => FileChunk::new(id.clone()).read_with(writer).await?,
                    None => {
                        return Err(FsError::corrupt_structure(
                            format!(
                                "size {} needs chunk {last_index}, which is missing",
                                metadata.size
                            ),
                            self.context(),
                        ));
                    }
                };
                payload.resize(keep, 0);
                self.write_chunks(writer, metadata, last_index, &payload)
                    .await
            }
        }
    }

    // ---------------------------------------------------------------------
    // Public operations, one handle each
    // ---------------------------------------------------------------------

    pub async fn stat(&self) -> FsResult<FileStat> {
        let reader = self.fs.reader().await;
        let result = self.metadata_with(&reader).await;
        reader.release()?;
        Ok(FileStat { size: result?.size })
    }

    /// Read up to `length` bytes at `position`. See [`read_with`](Self::read_with).
    #[instrument(level = "debug", skip(self), fields(file = %self.id))]
    pub async fn read(&self, position: u64, length: u64) -> FsResult<Vec<u8>> {
        let reader = self.fs.reader().await;
        let result = self.read_with(&reader, position, length).await;
        reader.release()?;
        result
    }

    /// The whole content.
    #[instrument(level = "debug", skip(self), fields(file = %self.id))]
    pub async fn read_all(&self) -> FsResult<Vec<u8>> {
        self.read(0, u64::MAX).await
    }

    #[instrument(level = "debug", skip(self, data), fields(file = %self.id, len = data.len()))]
    pub async fn append(&self, data: &[u8]) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.append_with(&writer, data).await;
        writer.release()?;
        result
    }

    #[instrument(level = "debug", skip(self, data), fields(file = %self.id, len = data.len()))]
    pub async fn write_all(&self, data: &[u8]) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.write_all_with(&writer, data).await;
        writer.release()?;
        result
    }

    #[instrument(level = "debug", skip(self), fields(file = %self.id))]
    pub async fn truncate(&self) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.truncate_with(&writer).await;
        writer.release()?;
        result
    }

    #[instrument(level = "debug", skip(self), fields(file = %self.id))]
    pub async fn set_len(&self, size: u64) -> FsResult<()> {
        let writer = self.fs.writer().await;
        let result = self.set_len_with(&writer, size).await;
        writer.release()?;
        result
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("id", &self.id)
            .field("path", &self.absolute_path())
            .finish()
    }
}
