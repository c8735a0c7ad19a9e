//! Load-aware placement of files onto storage nodes.
//!
//! Tracks every registered storage node with its cumulative reserved load,
//! and maps file paths to their owning node. The load is a reservation:
//! it is incremented the moment a node is recommended, before any byte is
//! written, so concurrent creations spread across nodes instead of all
//! landing on the same transiently-lightest one.

use std::collections::HashMap;

use tdfs_types::status_code::MetaCode;
use tdfs_types::{make_error, make_error_msg, Address, Result};

/// A registered storage node and its reserved load in bytes.
#[derive(Debug, Clone)]
pub struct StorageNode {
    pub addr: Address,
    pub assigned_load: u64,
}

/// Placement state: the node registry plus the file-path -> node map.
#[derive(Debug, Default)]
pub struct PlacementTracker {
    /// Registration order is preserved; ties in load go to the
    /// earliest-registered node.
    nodes: Vec<StorageNode>,
    /// Owning node per canonical file path.
    locations: HashMap<String, Address>,
}

impl PlacementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the registry. The handshake that proves the node is
    /// alive happens in the service layer before this is called.
    pub fn add_node(&mut self, addr: Address) {
        self.nodes.push(StorageNode {
            addr,
            assigned_load: 0,
        });
    }

    /// Pick the least-loaded node for a new file of `file_size` bytes and
    /// reserve that load on it. Selection and increment happen in one call
    /// so the caller's lock makes them atomic against concurrent
    /// recommendations.
    pub fn recommend(&mut self, file_size: u64) -> Result<Address> {
        let node = self
            .nodes
            .iter_mut()
            .min_by_key(|n| n.assigned_load)
            .ok_or_else(|| {
                tdfs_types::Status::with_message(
                    MetaCode::NO_NODES_REGISTERED,
                    "no storage nodes registered",
                )
            })?;
        node.assigned_load += file_size;
        Ok(node.addr)
    }

    /// Record the owning node for a file path.
    ///
    /// Rebinding is a caller error; the namespace insert upstream already
    /// rejects duplicate paths.
    pub fn bind(&mut self, path: &str, addr: Address) -> Result<()> {
        if self.locations.contains_key(path) {
            return make_error_msg(MetaCode::EXISTS, format!("path already bound: {}", path));
        }
        self.locations.insert(path.to_string(), addr);
        Ok(())
    }

    /// Exact-path lookup of a file's owning node.
    pub fn locate(&self, path: &str) -> Result<Address> {
        match self.locations.get(path) {
            Some(addr) => Ok(*addr),
            None => make_error(MetaCode::FILE_NOT_FOUND),
        }
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Snapshot of the registered nodes and their reserved loads.
    pub fn nodes(&self) -> &[StorageNode] {
        &self.nodes
    }

    /// Drop all path bindings and reservations. The nodes themselves stay
    /// registered; used when the namespace is reset between benchmark runs.
    pub fn reset_usage(&mut self) {
        self.locations.clear();
        for node in &mut self.nodes {
            node.assigned_load = 0;
        }
    }
}
