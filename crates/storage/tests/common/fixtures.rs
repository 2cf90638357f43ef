use tempfile::TempDir;
use thaw_core::ChunkRef;
use thaw_storage::{FilesystemBackend, ObjectMetadata};

/// Storage key of a chunk for `tenant` with the given fingerprint.
pub fn chunk_key(tenant: &str, fingerprint: u64) -> String {
    ChunkRef::new(tenant, fingerprint, 1_700_000_000_000, 1_700_000_360_000, 0xbeef)
        .expect("valid chunk")
        .storage_key()
        .into_string()
}

/// Filesystem store seeded with `(key, size, storage_class)` objects.
pub async fn archived_store(objects: &[(&str, usize, &str)]) -> (TempDir, FilesystemBackend) {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = FilesystemBackend::new(dir.path()).await.expect("backend");
    for (key, size, class) in objects {
        backend
            .put_object(key, &vec![0u8; *size], &ObjectMetadata::with_class(*class))
            .await
            .expect("seed object");
    }
    (dir, backend)
}
