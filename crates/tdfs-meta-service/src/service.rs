//! MetaService trait and implementation.
//!
//! The `MetaService` trait defines the public async interface for all
//! namespace and placement operations. `MetaServiceImpl` implements it over
//! a [`NamespaceTree`] and a [`PlacementTracker`]; each operation is a
//! single atomic transaction against that state, with no cross-request
//! state.
//!
//! Locking discipline: the namespace tree sits behind a `RwLock` (listings
//! may run concurrently, mutations are exclusive); the placement tracker
//! and node registry sit behind a separate `Mutex` so that recommend +
//! load-reservation is atomic and registration never contends with
//! namespace reads.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::instrument;

use crate::namespace::{clean_path, split_parent, NamespaceTree, NsNode, ROOT_PATH};
use crate::pinger::NodePinger;
use crate::placement::{PlacementTracker, StorageNode};
use tdfs_proto::meta::{
    DeleteAllReq, DeleteAllRsp, GetLocationReq, GetLocationRsp, MkdirReq, MkdirRsp, OpenDirReq,
    OpenDirRsp, PingReq, PingRsp, ReadDirAllReq, ReadDirAllRsp, ReadDirEntryReq, ReadDirEntryRsp,
    RegisterFileReq, RegisterFileRsp,
};
use tdfs_types::status_code::MetaCode;
use tdfs_types::{make_error_msg, Address, Result, Status};

/// The metadata service: namespace and placement operations.
#[async_trait]
pub trait MetaService: Send + Sync {
    /// Liveness check: echo the challenge.
    async fn ping(&self, req: PingReq) -> Result<PingRsp>;

    /// Create a directory. Succeeds idempotently if the directory already
    /// exists.
    async fn mkdir(&self, req: MkdirReq) -> Result<MkdirRsp>;

    /// Reserve a placement for a new file and record it in the namespace.
    /// Returns the storage node the caller should upload the bytes to.
    async fn register_file_creation(&self, req: RegisterFileReq) -> Result<RegisterFileRsp>;

    /// Look up the storage node owning an existing file.
    async fn get_location(&self, req: GetLocationReq) -> Result<GetLocationRsp>;

    /// Validate a directory and return its handle (the canonical path).
    async fn open_dir(&self, req: OpenDirReq) -> Result<OpenDirRsp>;

    /// Read a single directory entry by listing index.
    async fn read_dir_entry(&self, req: ReadDirEntryReq) -> Result<ReadDirEntryRsp>;

    /// Read the entire directory listing in one response.
    async fn read_dir_all(&self, req: ReadDirAllReq) -> Result<ReadDirAllRsp>;

    /// Reset the namespace. Used for test and benchmark isolation.
    async fn delete_all_data(&self, req: DeleteAllReq) -> Result<DeleteAllRsp>;
}

/// Concrete implementation of the `MetaService` trait.
pub struct MetaServiceImpl {
    tree: RwLock<NamespaceTree>,
    placement: Mutex<PlacementTracker>,
    pinger: Arc<dyn NodePinger>,
}

impl MetaServiceImpl {
    /// Create a new service instance with no registered storage nodes.
    pub fn new(pinger: Arc<dyn NodePinger>) -> Self {
        Self {
            tree: RwLock::new(NamespaceTree::new()),
            placement: Mutex::new(PlacementTracker::new()),
            pinger,
        }
    }

    /// Register a storage node after a challenge/response handshake.
    ///
    /// The node must echo the random challenge unchanged; a mismatch or an
    /// unreachable node keeps it out of the registry. There is no
    /// deregistration path.
    #[instrument(level = "info", name = "register_storage_node", skip(self))]
    pub async fn register_storage_node(&self, addr: Address) -> Result<()> {
        let challenge: u64 = rand::random();
        let echoed = self.pinger.ping(addr, challenge).await?;
        if echoed != challenge {
            return make_error_msg(
                MetaCode::CHALLENGE_MISMATCH,
                format!("node {} echoed {} for challenge {}", addr, echoed, challenge),
            );
        }

        self.placement.lock().add_node(addr);
        tracing::info!(%addr, "storage node registered");
        Ok(())
    }

    /// Snapshot of the registered nodes and their reserved loads.
    pub fn storage_nodes(&self) -> Vec<StorageNode> {
        self.placement.lock().nodes().to_vec()
    }
}

#[async_trait]
impl MetaService for MetaServiceImpl {
    async fn ping(&self, req: PingReq) -> Result<PingRsp> {
        Ok(PingRsp {
            challenge: req.challenge,
        })
    }

    #[instrument(level = "debug", name = "meta_mkdir", skip(self, req), fields(path = %req.path))]
    async fn mkdir(&self, req: MkdirReq) -> Result<MkdirRsp> {
        let path = clean_path(&req.path);
        if path == ROOT_PATH {
            // The root always exists.
            return Ok(MkdirRsp { path });
        }

        let (parent, name) = split_parent(&path);
        let mut tree = self.tree.write();

        // Tolerate retries: an existing directory is a success, not an
        // error. An existing file at the path is still a conflict.
        if let Ok(node) = tree.resolve(&path) {
            if node.is_dir {
                tracing::debug!(%path, "mkdir: directory already exists");
                return Ok(MkdirRsp { path });
            }
            return make_error_msg(MetaCode::EXISTS, format!("file exists at {}", path));
        }

        tree.insert(&parent, NsNode::directory(name, path.clone()))?;
        tracing::debug!(%path, "directory created");
        Ok(MkdirRsp { path })
    }

    #[instrument(
        level = "debug",
        name = "meta_register_file",
        skip(self, req),
        fields(path = %req.path, size = req.size)
    )]
    async fn register_file_creation(&self, req: RegisterFileReq) -> Result<RegisterFileRsp> {
        let path = clean_path(&req.path);
        if path == ROOT_PATH {
            return make_error_msg(MetaCode::INVALID_PATH, "cannot create a file at the root");
        }

        let (parent, name) = split_parent(&path);
        let mut tree = self.tree.write();

        // Validate before reserving anything: parent must be a directory
        // and the name must be free.
        {
            let parent_node = tree.resolve(&parent)?;
            if !parent_node.is_dir {
                return make_error_msg(
                    MetaCode::NOT_DIRECTORY,
                    format!("{} is not a directory", parent),
                );
            }
            if parent_node.children.iter().any(|c| c.name == name) {
                return make_error_msg(MetaCode::EXISTS, format!("entry already exists: {}", path));
            }
        }

        // Reserve the placement, then record the file. Both locks are held
        // until the insert lands so a concurrent creation cannot observe
        // the reservation without the namespace entry.
        let node_addr = {
            let mut placement = self.placement.lock();
            let addr = placement.recommend(req.size)?;
            placement.bind(&path, addr)?;
            addr
        };

        tree.insert(&parent, NsNode::file(name, path.clone(), req.size, node_addr))?;
        tracing::debug!(%path, node = %node_addr, "file placement registered");
        Ok(RegisterFileRsp { node: node_addr })
    }

    async fn get_location(&self, req: GetLocationReq) -> Result<GetLocationRsp> {
        let path = clean_path(&req.path);
        let node = self.placement.lock().locate(&path)?;
        Ok(GetLocationRsp { node })
    }

    async fn open_dir(&self, req: OpenDirReq) -> Result<OpenDirRsp> {
        let path = clean_path(&req.path);
        let tree = self.tree.read();
        let node = tree.resolve(&path)?;
        if !node.is_dir {
            return make_error_msg(
                MetaCode::NOT_DIRECTORY,
                format!("{} is not a directory", path),
            );
        }
        // The canonical path doubles as the directory handle.
        Ok(OpenDirRsp { handle: path })
    }

    async fn read_dir_entry(&self, req: ReadDirEntryReq) -> Result<ReadDirEntryRsp> {
        if req.index < 0 {
            return make_error_msg(
                MetaCode::NEGATIVE_INDEX,
                format!("negative directory index: {}", req.index),
            );
        }

        let tree = self.tree.read();
        let children = tree.list(&req.handle)?;
        let index = req.index as usize;
        if index >= children.len() {
            // Sentinel, not an error: the listing is exhausted.
            return Err(Status::new(MetaCode::END_OF_DIRECTORY));
        }

        Ok(ReadDirEntryRsp {
            entry: children[index].to_file_info(),
        })
    }

    async fn read_dir_all(&self, req: ReadDirAllReq) -> Result<ReadDirAllRsp> {
        let tree = self.tree.read();
        let children = tree.list(&req.handle)?;
        Ok(ReadDirAllRsp {
            entries: children.iter().map(NsNode::to_file_info).collect(),
        })
    }

    async fn delete_all_data(&self, _req: DeleteAllReq) -> Result<DeleteAllRsp> {
        self.tree.write().reset();
        self.placement.lock().reset_usage();
        tracing::info!("namespace reset");
        Ok(DeleteAllRsp {})
    }
}
