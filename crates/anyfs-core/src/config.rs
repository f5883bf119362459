//! Filesystem configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};

/// Default bytes per chunk object (16 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Per-instance settings, fixed when the filesystem is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Maximum payload length of one chunk object.
    pub chunk_size: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FsConfig {
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check the configuration before a filesystem is built from it.
    pub fn validate(&self) -> FsResult<()> {
        if self.chunk_size == 0 {
            return Err(FsError::Config {
                reason: "chunk_size must be greater than zero".to_string(),
            });
        }
        if u64::try_from(self.chunk_size).is_err() {
            return Err(FsError::Config {
                reason: "chunk_size does not fit in 64 bits".to_string(),
            });
        }
        Ok(())
    }
}
