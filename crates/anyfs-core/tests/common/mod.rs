#![allow(dead_code)]

use std::sync::Arc;

use anyfs_core::{FileSystem, FsConfig, InMemoryProvider, ObjectKey};

/// Small chunk size so multi-chunk paths are exercised with short inputs.
pub const TEST_CHUNK_SIZE: usize = 8;

/// Create a deterministic key for testing
pub fn create_test_key() -> ObjectKey {
    ObjectKey::new([0x01; 32])
}

/// Create a key from a seed value, distinct per seed
pub fn create_seeded_key(seed: u8) -> ObjectKey {
    let mut bytes = [seed; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = byte.wrapping_add(i as u8);
    }
    ObjectKey::new(bytes)
}

/// Create a filesystem over a fresh in-memory provider.
///
/// Returns the provider too, for inspecting stored blobs.
pub async fn create_test_fs() -> (FileSystem, Arc<InMemoryProvider>) {
    create_test_fs_with(InMemoryProvider::new(), TEST_CHUNK_SIZE).await
}

pub async fn create_test_fs_with(
    provider: InMemoryProvider,
    chunk_size: usize,
) -> (FileSystem, Arc<InMemoryProvider>) {
    let provider = Arc::new(provider);
    let fs = FileSystem::create(
        provider.clone(),
        create_test_key(),
        FsConfig::default().with_chunk_size(chunk_size),
    )
    .await
    .expect("filesystem creation should succeed");
    (fs, provider)
}

/// Deterministic, non-repeating-looking test content of `len` bytes
pub fn test_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

/// Install a tracing subscriber honoring RUST_LOG, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
