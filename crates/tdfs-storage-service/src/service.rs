//! StorageService trait and implementation.

use async_trait::async_trait;
use tracing::instrument;

use crate::store::FileStore;
use tdfs_proto::storage::{
    CreateFileReq, CreateFileRsp, GetFileReq, GetFileRsp, GrepReq, GrepRsp, PingReq, PingRsp,
};
use tdfs_types::Result;

/// The storage node service: whole-file byte transfer plus server-side
/// grep.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Liveness check: echo the challenge. Used by the metadata service's
    /// registration handshake.
    async fn ping(&self, req: PingReq) -> Result<PingRsp>;

    /// Store a whole file.
    async fn create_file(&self, req: CreateFileReq) -> Result<CreateFileRsp>;

    /// Read a whole file.
    async fn get_file(&self, req: GetFileReq) -> Result<GetFileRsp>;

    /// Count occurrences of a word in a stored file without shipping the
    /// bytes to the client.
    async fn grep(&self, req: GrepReq) -> Result<GrepRsp>;
}

/// Concrete implementation over a disk-backed [`FileStore`].
pub struct StorageServiceImpl {
    store: FileStore,
}

impl StorageServiceImpl {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Return the underlying store.
    pub fn store(&self) -> &FileStore {
        &self.store
    }
}

#[async_trait]
impl StorageService for StorageServiceImpl {
    async fn ping(&self, req: PingReq) -> Result<PingRsp> {
        Ok(PingRsp {
            challenge: req.challenge,
        })
    }

    #[instrument(level = "debug", name = "storage_create_file", skip(self, req), fields(name = %req.name, bytes = req.data.len()))]
    async fn create_file(&self, req: CreateFileReq) -> Result<CreateFileRsp> {
        let bytes_written = self.store.create_file(&req.name, &req.data).await?;
        Ok(CreateFileRsp { bytes_written })
    }

    #[instrument(level = "debug", name = "storage_get_file", skip(self, req), fields(name = %req.name))]
    async fn get_file(&self, req: GetFileReq) -> Result<GetFileRsp> {
        let data = self.store.read_file(&req.name).await?;
        Ok(GetFileRsp { data })
    }

    #[instrument(level = "debug", name = "storage_grep", skip(self, req), fields(name = %req.name, word = %req.word))]
    async fn grep(&self, req: GrepReq) -> Result<GrepRsp> {
        let count = self.store.grep(&req.name, &req.word).await?;
        Ok(GrepRsp { count })
    }
}
