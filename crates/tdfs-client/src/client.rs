//! The high-level tdfs client.
//!
//! Control flow for a read or create: consult the local cache/predictor,
//! fall back to the metadata service on a miss, then talk directly to the
//! owning storage node for the byte transfer.

use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;

use crate::cache::{CacheDecision, ClientCache};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::meta::{MetaStub, RemoteMetaStub};
use crate::storage::{RemoteStorageStub, StorageStub};
use tdfs_proto::FileInfo;
use tdfs_types::Address;

/// A tdfs client: metadata stub + storage stub + prefetching cache.
pub struct DfsClient {
    config: ClientConfig,
    meta: Arc<dyn MetaStub>,
    storage: Arc<dyn StorageStub>,
    cache: ClientCache,
}

impl DfsClient {
    /// Create a client talking to the configured metadata service over
    /// TCP.
    pub fn connect(config: ClientConfig) -> Self {
        let meta = Arc::new(RemoteMetaStub::new(config.meta_addr));
        let storage = Arc::new(RemoteStorageStub::new());
        Self::with_stubs(config, meta, storage)
    }

    /// Create a client over explicit stub implementations (used by tests).
    pub fn with_stubs(
        config: ClientConfig,
        meta: Arc<dyn MetaStub>,
        storage: Arc<dyn StorageStub>,
    ) -> Self {
        let cache = ClientCache::new(config.prefetch_threshold, config.prefetch_window);
        Self {
            config,
            meta,
            storage,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Verify the metadata service is reachable and answering.
    pub async fn ping(&self) -> ClientResult<()> {
        let challenge: u64 = rand::random();
        let echoed = self.meta.ping(challenge).await?;
        if echoed != challenge {
            return Err(crate::error::ClientError::Internal(format!(
                "metadata service echoed {} for challenge {}",
                echoed, challenge
            )));
        }
        Ok(())
    }

    /// Create a directory.
    pub async fn mkdir(&self, path: &str) -> ClientResult<String> {
        self.meta.mkdir(path).await
    }

    /// Open a directory, returning its handle (the canonical path).
    pub async fn open_dir(&self, path: &str) -> ClientResult<String> {
        self.meta.open_dir(path).await
    }

    /// Create a file: ask the metadata service for a placement, then
    /// upload the bytes to the chosen storage node. Returns the byte count
    /// the node acknowledged.
    #[instrument(level = "debug", name = "client_create_file", skip(self, data), fields(bytes = data.len()))]
    pub async fn create_file(&self, path: &str, data: &[u8]) -> ClientResult<u64> {
        let node = self
            .meta
            .register_file_creation(path, data.len() as u64)
            .await?;
        self.storage.create_file(node, path, data.to_vec()).await
    }

    /// Read a file back: locate its owning node, then fetch the bytes.
    pub async fn get_file(&self, path: &str) -> ClientResult<Vec<u8>> {
        let node = self.meta.get_location(path).await?;
        self.storage.get_file(node, path).await
    }

    /// Read one directory entry by index. `Ok(None)` signals the end of
    /// the directory.
    ///
    /// With `use_cache` set, the access-frequency predictor may promote
    /// the directory to a single bulk listing fetch; without it, every
    /// call is a single-entry remote read and the history is untouched.
    pub async fn read_dir_entry(
        &self,
        dir: &str,
        index: i64,
        use_cache: bool,
    ) -> ClientResult<Option<FileInfo>> {
        if !use_cache {
            return self.meta.read_dir_entry(dir, index).await;
        }

        match self.cache.decide(dir, index, Instant::now()) {
            CacheDecision::Serve(entry) => Ok(entry),
            CacheDecision::Prefetch => {
                tracing::debug!(dir, index, "prefetching directory listing");
                let entries = self.meta.read_dir_all(dir).await?;
                self.cache.store_complete(dir, entries.clone());
                let entry = usize::try_from(index)
                    .ok()
                    .and_then(|i| entries.get(i).cloned());
                Ok(entry)
            }
            CacheDecision::SingleRead => self.meta.read_dir_entry(dir, index).await,
        }
    }

    /// Fetch a whole directory listing, bypassing the cache.
    pub async fn read_dir_all(&self, dir: &str) -> ClientResult<Vec<FileInfo>> {
        self.meta.read_dir_all(dir).await
    }

    /// Count word occurrences in one file, running the count on the node
    /// that owns the bytes.
    pub async fn grep_file(&self, node: Address, path: &str, word: &str) -> ClientResult<u64> {
        self.storage.grep(node, path, word).await
    }

    /// Reset the namespace on the metadata service. The local cache is
    /// unaware of server-side resets, so it is cleared here as well.
    pub async fn delete_all_data(&self) -> ClientResult<()> {
        self.meta.delete_all_data().await?;
        self.clear_cache();
        Ok(())
    }

    /// Drop the listing cache and all access history (e.g. between
    /// benchmark runs).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! An in-memory metadata fake shared by the cache and traversal tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tdfs_types::status_code::MetaCode;
    use tdfs_types::{Address, Status};

    use super::*;
    use crate::error::ClientError;

    /// In-memory listings keyed by canonical directory path, with call
    /// counters for asserting how often each RPC was issued.
    pub(crate) struct FakeMeta {
        pub(crate) listings: Mutex<HashMap<String, Vec<FileInfo>>>,
        pub(crate) entry_calls: AtomicUsize,
        pub(crate) all_calls: AtomicUsize,
    }

    impl FakeMeta {
        pub(crate) fn new() -> Self {
            Self {
                listings: Mutex::new(HashMap::new()),
                entry_calls: AtomicUsize::new(0),
                all_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_dir(self, path: &str, entries: Vec<FileInfo>) -> Self {
            self.listings.lock().insert(path.to_string(), entries);
            self
        }

        pub(crate) fn file_entry(dir: &str, name: &str) -> FileInfo {
            FileInfo {
                name: name.to_string(),
                path: format!("{}/{}", dir, name),
                size: 1,
                mode: 0o100644,
                owner: Some(Address::localhost(5001)),
                ..Default::default()
            }
        }

        pub(crate) fn dir_entry(dir: &str, name: &str) -> FileInfo {
            FileInfo {
                name: name.to_string(),
                path: format!("{}/{}", dir, name),
                is_dir: true,
                mode: 0o040755,
                ..Default::default()
            }
        }

        fn lookup(&self, handle: &str) -> Result<Vec<FileInfo>, ClientError> {
            self.listings.lock().get(handle).cloned().ok_or_else(|| {
                ClientError::Status(Status::with_message(
                    MetaCode::NOT_FOUND,
                    format!("no such directory: {}", handle),
                ))
            })
        }
    }

    #[async_trait]
    impl MetaStub for FakeMeta {
        async fn ping(&self, challenge: u64) -> ClientResult<u64> {
            Ok(challenge)
        }

        async fn mkdir(&self, path: &str) -> ClientResult<String> {
            self.listings
                .lock()
                .entry(path.to_string())
                .or_insert_with(Vec::new);
            Ok(path.to_string())
        }

        async fn register_file_creation(&self, _path: &str, _size: u64) -> ClientResult<Address> {
            Ok(Address::localhost(5001))
        }

        async fn get_location(&self, _path: &str) -> ClientResult<Address> {
            Ok(Address::localhost(5001))
        }

        async fn open_dir(&self, path: &str) -> ClientResult<String> {
            self.lookup(path)?;
            Ok(path.to_string())
        }

        async fn read_dir_entry(&self, handle: &str, index: i64) -> ClientResult<Option<FileInfo>> {
            self.entry_calls.fetch_add(1, Ordering::SeqCst);
            let entries = self.lookup(handle)?;
            if index < 0 {
                return Err(ClientError::Status(Status::new(MetaCode::NEGATIVE_INDEX)));
            }
            Ok(entries.get(index as usize).cloned())
        }

        async fn read_dir_all(&self, handle: &str) -> ClientResult<Vec<FileInfo>> {
            self.all_calls.fetch_add(1, Ordering::SeqCst);
            self.lookup(handle)
        }

        async fn delete_all_data(&self) -> ClientResult<()> {
            self.listings.lock().clear();
            Ok(())
        }
    }

    /// A storage stub that never expects to be called.
    pub(crate) struct NoStorage;

    #[async_trait]
    impl StorageStub for NoStorage {
        async fn ping(&self, _node: Address, challenge: u64) -> ClientResult<u64> {
            Ok(challenge)
        }
        async fn create_file(
            &self,
            _node: Address,
            _name: &str,
            _data: Vec<u8>,
        ) -> ClientResult<u64> {
            panic!("unexpected storage call");
        }
        async fn get_file(&self, _node: Address, _name: &str) -> ClientResult<Vec<u8>> {
            panic!("unexpected storage call");
        }
        async fn grep(&self, _node: Address, _name: &str, _word: &str) -> ClientResult<u64> {
            panic!("unexpected storage call");
        }
    }

    pub(crate) fn client_with(meta: FakeMeta, config: ClientConfig) -> (Arc<FakeMeta>, DfsClient) {
        let meta = Arc::new(meta);
        let client = DfsClient::with_stubs(config, meta.clone(), Arc::new(NoStorage));
        (meta, client)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{client_with, FakeMeta};
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config(threshold: u32, window_ms: u64) -> ClientConfig {
        ClientConfig {
            prefetch_threshold: threshold,
            prefetch_window: Duration::from_millis(window_ms),
            ..Default::default()
        }
    }

    fn five_entry_dir() -> FakeMeta {
        let entries = (0..5)
            .map(|i| FakeMeta::file_entry("d", &format!("f{}.txt", i)))
            .collect();
        FakeMeta::new().with_dir("d", entries)
    }

    #[tokio::test]
    async fn test_reads_below_threshold_stay_single() {
        let (meta, client) = client_with(five_entry_dir(), config(3, 100));

        for i in 0..2 {
            let entry = client.read_dir_entry("d", i, true).await.unwrap().unwrap();
            assert_eq!(entry.name, format!("f{}.txt", i));
        }

        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 2);
        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_threshold_triggers_one_bulk_fetch() {
        let (meta, client) = client_with(five_entry_dir(), config(3, 100));

        // Four reads inside the window: two single reads, one prefetch,
        // then pure cache hits.
        for i in 0..4 {
            let entry = client.read_dir_entry("d", i, true).await.unwrap().unwrap();
            assert_eq!(entry.name, format!("f{}.txt", i));
        }

        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 1);
        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 2);

        // Every remaining index is covered by the cached listing.
        let entry = client.read_dir_entry("d", 4, true).await.unwrap().unwrap();
        assert_eq!(entry.name, "f4.txt");
        assert!(client.read_dir_entry("d", 5, true).await.unwrap().is_none());
        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 2);
        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_cache_bypasses_predictor() {
        let (meta, client) = client_with(five_entry_dir(), config(2, 100));

        for i in 0..4 {
            client.read_dir_entry("d", i, false).await.unwrap();
        }

        // No history updates, no prefetch, four remote single reads.
        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 4);
        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_burst_does_not_prefetch() {
        let (meta, client) = client_with(five_entry_dir(), config(2, 20));

        client.read_dir_entry("d", 0, true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Outside the window: the counter was reset, so this is the first
        // access of a new burst.
        client.read_dir_entry("d", 1, true).await.unwrap();

        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 0);
        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forgets_listings_and_history() {
        let (meta, client) = client_with(five_entry_dir(), config(2, 100));

        client.read_dir_entry("d", 0, true).await.unwrap();
        client.read_dir_entry("d", 1, true).await.unwrap(); // prefetch
        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 1);

        client.clear_cache();

        // Back to square one: a single read, then another prefetch.
        client.read_dir_entry("d", 0, true).await.unwrap();
        assert_eq!(meta.entry_calls.load(Ordering::SeqCst), 2);
        client.read_dir_entry("d", 1, true).await.unwrap();
        assert_eq!(meta.all_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_eof() {
        let (_meta, client) = client_with(five_entry_dir(), config(1, 100));

        // Threshold 1: the first read prefetches.
        assert!(client.read_dir_entry("d", 0, true).await.unwrap().is_some());
        assert!(client.read_dir_entry("d", 99, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_dir_surfaces_not_found() {
        let (_meta, client) = client_with(FakeMeta::new(), config(3, 100));

        let err = client.read_dir_entry("ghost", 0, true).await.unwrap_err();
        assert_eq!(
            err.status_code(),
            Some(tdfs_types::status_code::MetaCode::NOT_FOUND)
        );
    }
}
