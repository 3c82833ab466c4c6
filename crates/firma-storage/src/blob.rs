//! In-memory blob store

use crate::traits::BlobStore;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use firma_types::BlobRef;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Content-addressed in-memory blob store. Refs are the SHA-256 hex of
/// the stored bytes, so storing identical bytes twice is a no-op.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobRef, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> StorageResult<BlobRef> {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let blob_ref = BlobRef::new(hex::encode(hasher.finalize()));

        let mut guard = self
            .blobs
            .write()
            .map_err(|_| StorageError::Backend("blobs lock poisoned".to_string()))?;
        guard.insert(blob_ref.clone(), bytes);
        Ok(blob_ref)
    }

    async fn get(&self, blob_ref: &BlobRef) -> StorageResult<Vec<u8>> {
        let guard = self
            .blobs
            .read()
            .map_err(|_| StorageError::Backend("blobs lock poisoned".to_string()))?;
        guard
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("blob {} not found", blob_ref)))
    }

    async fn remove(&self, blob_ref: &BlobRef) -> StorageResult<()> {
        let mut guard = self
            .blobs
            .write()
            .map_err(|_| StorageError::Backend("blobs lock poisoned".to_string()))?;
        guard.remove(blob_ref);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let store = MemoryBlobStore::new();
        let blob_ref = store.put(b"pdf bytes".to_vec()).await.unwrap();
        assert_eq!(store.get(&blob_ref).await.unwrap(), b"pdf bytes");
    }

    #[tokio::test]
    async fn refs_are_content_addressed() {
        let store = MemoryBlobStore::new();
        let a = store.put(b"same".to_vec()).await.unwrap();
        let b = store.put(b"same".to_vec()).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.get(&BlobRef::new("missing")).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
