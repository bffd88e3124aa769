//! Metadata Fetch Cache
//!
//! Memoizes content identifier -> parsed metadata for the life of the
//! process. A failed resolution is cached as `None` so it is never retried;
//! content identifiers are immutable, so nothing is ever evicted.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bounty_core::{BountyMetadata, MetadataSource};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default bound on a single resolution.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MetadataCache {
    source: Arc<dyn MetadataSource>,
    entries: RwLock<HashMap<String, Option<BountyMetadata>>>,
    timeout: Duration,
}

impl MetadataCache {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self::with_timeout(source, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn MetadataSource>, timeout: Duration) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Resolve `cid`, never failing. Concurrent misses on the same identifier
    /// may both reach the source; both store the same value.
    pub async fn fetch(&self, cid: &str) -> Option<BountyMetadata> {
        if let Some(entry) = self.entries.read().await.get(cid) {
            return entry.clone();
        }

        let resolved = self.resolve(cid).await;
        self.entries
            .write()
            .await
            .insert(cid.to_string(), resolved.clone());
        resolved
    }

    async fn resolve(&self, cid: &str) -> Option<BountyMetadata> {
        let response = match tokio::time::timeout(self.timeout, self.source.resolve(cid)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(cid, error = %e, "metadata fetch failed");
                return None;
            }
            Err(_) => {
                warn!(cid, timeout_ms = self.timeout.as_millis() as u64, "metadata fetch timed out");
                return None;
            }
        };

        if !response.success {
            warn!(cid, error = ?response.error, "metadata service reported failure");
            return None;
        }

        let parsed = response.data.as_ref().and_then(BountyMetadata::from_value);
        match &parsed {
            Some(meta) => debug!(cid, title = %meta.title, "metadata resolved"),
            None => warn!(cid, "metadata payload missing or not an object"),
        }
        parsed
    }

    /// Cached entry without fetching: `None` if never attempted,
    /// `Some(None)` if attempted and failed.
    pub async fn peek(&self, cid: &str) -> Option<Option<BountyMetadata>> {
        self.entries.read().await.get(cid).cloned()
    }

    pub async fn contains(&self, cid: &str) -> bool {
        self.entries.read().await.contains_key(cid)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
