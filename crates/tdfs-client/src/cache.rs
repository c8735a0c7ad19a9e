//! Per-directory listing cache with an access-frequency prefetch
//! predictor.
//!
//! Every cache-miss read of a directory bumps that directory's access
//! counter. A counter that goes stale (no access within the sliding
//! window) resets to zero; a counter that reaches the threshold promotes
//! the directory to a single bulk listing fetch, after which all reads are
//! served locally. The heuristic trades one `ReadDirAll` round trip
//! against per-entry round trips; a directory accessed just under the
//! threshold keeps paying per entry.
//!
//! Both maps sit behind one mutex: the traversal engine calls
//! [`ClientCache::decide`] from many workers concurrently.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tdfs_proto::FileInfo;

/// A cached directory listing.
#[derive(Debug, Clone)]
pub struct DirListing {
    /// True once the entire listing has been fetched; only complete
    /// listings are served from cache.
    pub complete: bool,
    pub entries: Vec<FileInfo>,
}

/// Access history for one directory.
#[derive(Debug)]
struct AccessRecord {
    last_access: Instant,
    count_in_window: u32,
}

/// What the caller should do for one directory read.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheDecision {
    /// Answer directly from the cached listing; `None` means the index is
    /// past the end of the directory.
    Serve(Option<FileInfo>),
    /// Fetch the whole listing now, cache it, and answer from it.
    Prefetch,
    /// Perform a single-entry remote read.
    SingleRead,
}

struct CacheInner {
    dirs: HashMap<String, DirListing>,
    history: HashMap<String, AccessRecord>,
}

/// The client-side metadata cache and prefetch predictor.
pub struct ClientCache {
    threshold: u32,
    window: Duration,
    inner: Mutex<CacheInner>,
}

impl ClientCache {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            // A threshold of zero would never trigger; treat it as one.
            threshold: threshold.max(1),
            window,
            inner: Mutex::new(CacheInner {
                dirs: HashMap::new(),
                history: HashMap::new(),
            }),
        }
    }

    /// Decide how to serve a read of `dir` at `index`, updating the access
    /// history. `now` is passed in for testability.
    pub fn decide(&self, dir: &str, index: i64, now: Instant) -> CacheDecision {
        let mut inner = self.inner.lock();

        if let Some(listing) = inner.dirs.get(dir) {
            if listing.complete {
                let entry = usize::try_from(index)
                    .ok()
                    .and_then(|i| listing.entries.get(i).cloned());
                return CacheDecision::Serve(entry);
            }
        }

        let record = inner
            .history
            .entry(dir.to_string())
            .or_insert(AccessRecord {
                last_access: now,
                count_in_window: 0,
            });

        // Stale record: the previous burst ended outside the window.
        if now.duration_since(record.last_access) > self.window {
            record.count_in_window = 0;
        }

        // Counting this access, has the directory become hot enough?
        if record.count_in_window + 1 >= self.threshold {
            return CacheDecision::Prefetch;
        }

        record.count_in_window += 1;
        record.last_access = now;
        CacheDecision::SingleRead
    }

    /// Store a complete listing for `dir`, overwriting any previous entry.
    pub fn store_complete(&self, dir: &str, entries: Vec<FileInfo>) {
        let mut inner = self.inner.lock();
        inner.dirs.insert(
            dir.to_string(),
            DirListing {
                complete: true,
                entries,
            },
        );
    }

    /// Whether a complete listing is cached for `dir`.
    pub fn is_complete(&self, dir: &str) -> bool {
        self.inner
            .lock()
            .dirs
            .get(dir)
            .map(|l| l.complete)
            .unwrap_or(false)
    }

    /// Drop the listing cache and all access history.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.dirs.clear();
        inner.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            path: format!("d/{}", name),
            ..Default::default()
        }
    }

    fn cache(threshold: u32, window_ms: u64) -> ClientCache {
        ClientCache::new(threshold, Duration::from_millis(window_ms))
    }

    #[test]
    fn test_first_accesses_are_single_reads() {
        let cache = cache(3, 100);
        let now = Instant::now();

        assert_eq!(cache.decide("d", 0, now), CacheDecision::SingleRead);
        assert_eq!(cache.decide("d", 1, now), CacheDecision::SingleRead);
    }

    #[test]
    fn test_threshold_triggers_prefetch() {
        let cache = cache(3, 100);
        let now = Instant::now();

        assert_eq!(cache.decide("d", 0, now), CacheDecision::SingleRead);
        assert_eq!(cache.decide("d", 1, now), CacheDecision::SingleRead);
        // Third access within the window, counting itself, reaches 3.
        assert_eq!(cache.decide("d", 2, now), CacheDecision::Prefetch);
    }

    #[test]
    fn test_threshold_one_prefetches_immediately() {
        let cache = cache(1, 100);
        assert_eq!(
            cache.decide("d", 0, Instant::now()),
            CacheDecision::Prefetch
        );
    }

    #[test]
    fn test_stale_record_resets_counter() {
        let cache = cache(2, 100);
        let start = Instant::now();

        assert_eq!(cache.decide("d", 0, start), CacheDecision::SingleRead);
        // Well past the window: counter resets, so this access counts as
        // the first of a new burst.
        let later = start + Duration::from_millis(500);
        assert_eq!(cache.decide("d", 1, later), CacheDecision::SingleRead);
        // Within the window of the reset access: triggers.
        assert_eq!(
            cache.decide("d", 2, later + Duration::from_millis(10)),
            CacheDecision::Prefetch
        );
    }

    #[test]
    fn test_complete_listing_serves_from_cache() {
        let cache = cache(3, 100);
        cache.store_complete("d", vec![entry("a"), entry("b")]);

        let now = Instant::now();
        match cache.decide("d", 0, now) {
            CacheDecision::Serve(Some(info)) => assert_eq!(info.name, "a"),
            other => panic!("expected Serve, got {:?}", other),
        }
        match cache.decide("d", 1, now) {
            CacheDecision::Serve(Some(info)) => assert_eq!(info.name, "b"),
            other => panic!("expected Serve, got {:?}", other),
        }
    }

    #[test]
    fn test_cached_out_of_bounds_is_end_of_directory() {
        let cache = cache(3, 100);
        cache.store_complete("d", vec![entry("a")]);

        assert_eq!(
            cache.decide("d", 1, Instant::now()),
            CacheDecision::Serve(None)
        );
        assert_eq!(
            cache.decide("d", -1, Instant::now()),
            CacheDecision::Serve(None)
        );
    }

    #[test]
    fn test_directories_tracked_independently() {
        let cache = cache(2, 100);
        let now = Instant::now();

        assert_eq!(cache.decide("d1", 0, now), CacheDecision::SingleRead);
        assert_eq!(cache.decide("d2", 0, now), CacheDecision::SingleRead);
        assert_eq!(cache.decide("d1", 1, now), CacheDecision::Prefetch);
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache = cache(2, 100);
        let now = Instant::now();

        cache.store_complete("d", vec![entry("a")]);
        let _ = cache.decide("e", 0, now);
        cache.clear();

        assert!(!cache.is_complete("d"));
        // History was dropped too: the next access starts a fresh burst.
        assert_eq!(cache.decide("e", 0, now), CacheDecision::SingleRead);
    }

    #[test]
    fn test_store_complete_overwrites() {
        let cache = cache(3, 100);
        cache.store_complete("d", vec![entry("old")]);
        cache.store_complete("d", vec![entry("new"), entry("newer")]);

        match cache.decide("d", 0, Instant::now()) {
            CacheDecision::Serve(Some(info)) => assert_eq!(info.name, "new"),
            other => panic!("expected Serve, got {:?}", other),
        }
    }
}
