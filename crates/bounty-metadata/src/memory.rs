//! In-memory content-addressed blob store
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bounty_core::{BlobStore, BountyError, PersistenceOptions, Result};
use tokio::sync::RwLock;

/// Identifiers are the blake3 digest of the bytes, so equal content always
/// lands under the same key.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    persistence_requests: AtomicUsize,
    fail_puts: AtomicBool,
    fail_persistence: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_id(bytes: &[u8]) -> String {
        format!("blake3:{}", blake3::hash(bytes))
    }

    /// Number of accepted `put` calls
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn persistence_count(&self) -> usize {
        self.persistence_requests.load(Ordering::SeqCst)
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>, _content_type: &str, _filename: &str) -> Result<String> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BountyError::Network("storage node unreachable".to_string()));
        }
        let cid = Self::content_id(&bytes);
        self.blobs.write().await.insert(cid.clone(), bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(cid).cloned())
    }

    async fn request_persistence(&self, cid: &str, _options: &PersistenceOptions) -> Result<String> {
        self.persistence_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_persistence.load(Ordering::SeqCst) {
            return Err(BountyError::Network("persistence request rejected".to_string()));
        }
        Ok(format!("request-{}", cid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_bytes_same_identifier() {
        let store = MemoryBlobStore::new();
        let a = store.put(b"{\"a\":1}".to_vec(), "application/json", "a.json").await.unwrap();
        let b = store.put(b"{\"a\":1}".to_vec(), "application/json", "b.json").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(store.get(&a).await.unwrap().unwrap(), b"{\"a\":1}");
        assert!(store.get("blake3:missing").await.unwrap().is_none());
    }
}
