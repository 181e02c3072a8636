use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::BlobError;
use crate::store::BlobStore;

/// Run the blob store conformance test suite against `disk`.
///
/// Call this from your backend's test module with a fresh store instance on
/// which `disk` is configured and `"no-such-disk"` is not.
///
/// # Errors
///
/// Returns an error if the backend fails an operation that should succeed.
pub async fn run_blob_store_conformance_tests(
    store: &dyn BlobStore,
    disk: &str,
) -> Result<(), BlobError> {
    test_missing_blob(store, disk).await?;
    test_put_and_read(store, disk).await?;
    test_put_replaces(store, disk).await?;
    test_delete(store, disk).await?;
    test_unknown_disk(store).await;
    test_nested_paths(store, disk).await?;
    Ok(())
}

async fn read_all(store: &dyn BlobStore, disk: &str, path: &str) -> Result<Vec<u8>, BlobError> {
    let mut reader = store.open_read(disk, path).await?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn test_missing_blob(store: &dyn BlobStore, disk: &str) -> Result<(), BlobError> {
    assert!(store.has_disk(disk), "store should report configured disk");
    assert!(!store.exists(disk, "missing/file.bin").await?);
    let opened = store.open_read(disk, "missing/file.bin").await;
    assert!(
        matches!(opened, Err(BlobError::NotFound(_))),
        "open_read on a missing blob should return NotFound"
    );
    Ok(())
}

async fn test_put_and_read(store: &dyn BlobStore, disk: &str) -> Result<(), BlobError> {
    store
        .put(disk, "conformance/hello.txt", Bytes::from_static(b"hello world"))
        .await?;
    assert!(store.exists(disk, "conformance/hello.txt").await?);
    assert_eq!(
        read_all(store, disk, "conformance/hello.txt").await?,
        b"hello world"
    );
    Ok(())
}

async fn test_put_replaces(store: &dyn BlobStore, disk: &str) -> Result<(), BlobError> {
    store
        .put(disk, "conformance/replace.txt", Bytes::from_static(b"first"))
        .await?;
    store
        .put(disk, "conformance/replace.txt", Bytes::from_static(b"second"))
        .await?;
    assert_eq!(
        read_all(store, disk, "conformance/replace.txt").await?,
        b"second"
    );
    Ok(())
}

async fn test_delete(store: &dyn BlobStore, disk: &str) -> Result<(), BlobError> {
    store
        .put(disk, "conformance/delete.txt", Bytes::from_static(b"bye"))
        .await?;
    assert!(store.delete(disk, "conformance/delete.txt").await?);
    assert!(!store.exists(disk, "conformance/delete.txt").await?);
    assert!(
        !store.delete(disk, "conformance/delete.txt").await?,
        "deleting a missing blob should return false"
    );
    Ok(())
}

async fn test_unknown_disk(store: &dyn BlobStore) {
    assert!(!store.has_disk("no-such-disk"));
    let result = store.exists("no-such-disk", "a.txt").await;
    assert!(
        matches!(result, Err(BlobError::UnknownDisk(_))),
        "operations on an unknown disk should return UnknownDisk"
    );
}

async fn test_nested_paths(store: &dyn BlobStore, disk: &str) -> Result<(), BlobError> {
    let path = "conformance/2026/10/deep/nested.bin";
    let data: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    store.put(disk, path, Bytes::from(data.clone())).await?;
    assert_eq!(read_all(store, disk, path).await?, data);
    assert!(!store.absolute_path(disk, path)?.is_empty());
    Ok(())
}
