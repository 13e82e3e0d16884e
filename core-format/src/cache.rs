//! Bounded in-memory result cache keyed by file identity.
//!
//! Entries remember the modification time and size observed when they were
//! stored; a lookup with a different stamp is a miss and the stale value is
//! never returned. Lookups use `peek`, so eviction follows insertion order.

use bridge_traits::FileMetadata;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// What a cached value was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified_at: Option<i64>,
    pub size: u64,
}

impl From<&FileMetadata> for FileStamp {
    fn from(metadata: &FileMetadata) -> Self {
        Self {
            modified_at: metadata.modified_at,
            size: metadata.size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

struct CacheEntry<V> {
    stamp: FileStamp,
    value: V,
}

pub struct ResultCache<V> {
    entries: RwLock<LruCache<PathBuf, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, path: &Path, stamp: &FileStamp) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.peek(path) {
            Some(entry) if entry.stamp == *stamp => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Last write wins for concurrent inserts on the same path.
    pub async fn insert(&self, path: &Path, stamp: FileStamp, value: V) {
        let mut entries = self.entries.write().await;
        entries.put(path.to_path_buf(), CacheEntry { stamp, value });
    }

    pub async fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().await.pop(path).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
