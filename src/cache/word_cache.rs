use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Serialize, Deserialize};
use crate::core::error::Result;
use crate::index::hitlist::PostingList;
use crate::storage::{read_blob, write_blob_atomic};

/// One-file snapshot of the whole cache, entries in LRU-to-MRU order.
#[derive(Serialize, Deserialize)]
struct CacheSnapshot {
    saved_at: DateTime<Utc>,
    entries: Vec<(String, PostingList)>,
}

/// Bounded LRU over recently fetched posting lists. A read accelerator
/// only: never authoritative, rebuildable from the barrels, and
/// snapshotted to disk after every `auto_save_interval` insertions.
/// Overlay hitlists are layered on by the caller and never cached.
pub struct WordCache {
    cache: LruCache<String, PostingList>,
    auto_save_interval: usize,
    updates_since_save: usize,
    path: PathBuf,
}

impl WordCache {
    /// Open the cache, warm-loading the last snapshot when present.
    /// Snapshot problems are logged and ignored.
    pub fn load(path: &Path, capacity: usize, auto_save_interval: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        let mut cache = LruCache::new(cap);

        if path.exists() {
            match read_snapshot(path) {
                Ok(snapshot) => {
                    let loaded = snapshot.entries.len();
                    for (word, postings) in snapshot.entries {
                        cache.put(word, postings);
                    }
                    println!("    Loaded {} cached words", loaded);
                }
                Err(e) => {
                    eprintln!("    Could not load word cache: {}", e);
                }
            }
        }

        WordCache {
            cache,
            auto_save_interval,
            updates_since_save: 0,
            path: path.to_path_buf(),
        }
    }

    pub fn get(&mut self, word: &str) -> Option<PostingList> {
        self.cache.get(word).cloned()
    }

    /// Insert a freshly fetched posting list. Returns the snapshot
    /// payload when the auto-save interval is reached; the caller
    /// writes it outside the cache lock.
    pub fn insert(&mut self, word: String, postings: PostingList) -> Option<Vec<u8>> {
        self.cache.put(word, postings);

        self.updates_since_save += 1;
        if self.updates_since_save >= self.auto_save_interval {
            self.updates_since_save = 0;
            return self.snapshot_payload().ok();
        }
        None
    }

    /// Drop a cached entry. Called after a word's overlay hitlists are
    /// merged into the delta so the next lookup refetches the barrel.
    pub fn invalidate(&mut self, word: &str) {
        self.cache.pop(word);
    }

    /// Serialized snapshot of the current contents.
    pub fn snapshot_payload(&self) -> Result<Vec<u8>> {
        // lru iterates MRU first; store LRU first so reloading with
        // repeated put() reproduces the recency order.
        let mut entries: Vec<(String, PostingList)> = self
            .cache
            .iter()
            .map(|(w, p)| (w.clone(), p.clone()))
            .collect();
        entries.reverse();

        let snapshot = CacheSnapshot {
            saved_at: Utc::now(),
            entries,
        };
        Ok(bincode::serialize(&snapshot)?)
    }

    pub fn persist(&self, payload: &[u8]) -> Result<()> {
        write_blob_atomic(&self.path, payload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn read_snapshot(path: &Path) -> Result<CacheSnapshot> {
    let payload = read_blob(path)?;
    Ok(bincode::deserialize(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::index::hitlist::Hitlist;

    fn postings(n: u64) -> PostingList {
        vec![Hitlist::new(DocId::paper(n), vec![0], vec![1, 0, 0, 1, 5])]
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = WordCache::load(&dir.path().join("cache.bin"), 2, 100);

        cache.insert("alpha".to_string(), postings(1));
        cache.insert("beta".to_string(), postings(2));
        // Touch alpha so beta becomes LRU.
        assert!(cache.get("alpha").is_some());
        cache.insert("gamma".to_string(), postings(3));

        assert!(cache.get("beta").is_none());
        assert!(cache.get("alpha").is_some());
        assert!(cache.get("gamma").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn snapshot_due_after_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = WordCache::load(&dir.path().join("cache.bin"), 10, 3);

        assert!(cache.insert("a".to_string(), postings(1)).is_none());
        assert!(cache.insert("b".to_string(), postings(2)).is_none());
        let payload = cache.insert("c".to_string(), postings(3));
        assert!(payload.is_some());
        // Counter reset after the due snapshot.
        assert!(cache.insert("d".to_string(), postings(4)).is_none());
    }

    #[test]
    fn snapshot_round_trip_preserves_recency_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let mut cache = WordCache::load(&path, 2, 100);
        cache.insert("old".to_string(), postings(1));
        cache.insert("mid".to_string(), postings(2));
        cache.insert("new".to_string(), postings(3)); // evicts "old"
        let payload = cache.snapshot_payload().unwrap();
        cache.persist(&payload).unwrap();

        let mut reloaded = WordCache::load(&path, 2, 100);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get("old").is_none());
        // "mid" is still the LRU entry after reload.
        reloaded.insert("fresh".to_string(), postings(4));
        assert!(reloaded.get("mid").is_none());
        assert!(reloaded.get("new").is_some());
    }

    #[test]
    fn corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, b"junk").unwrap();

        let cache = WordCache::load(&path, 4, 100);
        assert!(cache.is_empty());
    }
}
