//! Content fingerprints and a bounded, batch-granular memoization cache.
//!
//! A batch is written atomically after it is fully assembled; readers only
//! ever observe complete values. Keys combine a document identity with
//! fingerprints of the buffer content and the queried id set, so any change
//! to either invalidates the entry by construction.

use lru::LruCache;
use sha1::Digest;
use sha1::Sha1;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// SHA-1 hex digest of some engine-visible content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Order-sensitive digest of an id sequence. Ids are NUL-separated so
    /// adjacent ids cannot collide across boundaries.
    pub fn of_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hasher = Sha1::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cache key for one (document, buffer state, queried set) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub document: String,
    pub content: Fingerprint,
    pub markers: Fingerprint,
}

/// Recency-bounded cache of fully-resolved batches.
///
/// Concurrent readers are fine; writes serialize on the internal mutex and
/// the last writer wins, which is acceptable because values are
/// deterministic for a fixed key.
pub struct BatchCache<V> {
    entries: Mutex<LruCache<BatchKey, Arc<V>>>,
}

impl<V> BatchCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(&self, key: &BatchKey) -> Option<Arc<V>> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Insert a fully-assembled value. Never call with a partial batch.
    pub async fn put(&self, key: BatchKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.lock().await.put(key, Arc::clone(&value));
        value
    }
}
