//! The in-memory namespace tree.
//!
//! A hierarchy of [`NsNode`]s rooted at the canonical path `.`. Each node is
//! exclusively owned by its parent; children are kept in insertion order,
//! which is also the listing order seen by `ReadDirEntry`. The tree itself
//! is lock-free; callers serialize access through the service-level locks.

use std::time::{SystemTime, UNIX_EPOCH};

use tdfs_proto::FileInfo;
use tdfs_types::status_code::MetaCode;
use tdfs_types::{make_error_msg, Address, Result};

/// Canonical path of the tree root.
pub const ROOT_PATH: &str = ".";

const DIR_MODE: u32 = 0o040755;
const FILE_MODE: u32 = 0o100644;

/// Clean a slash-separated path into its canonical form.
///
/// Collapses duplicate slashes, strips leading `./` and any leading or
/// trailing slashes. The empty path, `/`, and `.` all map to [`ROOT_PATH`].
pub fn clean_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        ROOT_PATH.to_string()
    } else {
        segments.join("/")
    }
}

/// Split a cleaned path into its parent path and final segment.
///
/// `"a/b/f.txt"` -> `("a/b", "f.txt")`; `"a"` -> `(".", "a")`.
pub fn split_parent(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (ROOT_PATH.to_string(), path.to_string()),
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// A single directory or file entry in the namespace.
#[derive(Debug, Clone)]
pub struct NsNode {
    /// Final path segment.
    pub name: String,
    /// Canonical full path.
    pub path: String,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (files only).
    pub size: u64,
    /// Storage node holding the file bytes (files only).
    pub owner: Option<Address>,
    /// Creation/modification time in nanoseconds since the epoch.
    pub mtime_ns: i64,
    /// Child entries, unique by name, in insertion order.
    pub children: Vec<NsNode>,
}

impl NsNode {
    fn root() -> Self {
        Self {
            name: ROOT_PATH.to_string(),
            path: ROOT_PATH.to_string(),
            is_dir: true,
            size: 0,
            owner: None,
            mtime_ns: now_ns(),
            children: Vec::new(),
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir: true,
            size: 0,
            owner: None,
            mtime_ns: now_ns(),
            children: Vec::new(),
        }
    }

    /// Create a file entry owned by a storage node.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        owner: Address,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir: false,
            size,
            owner: Some(owner),
            mtime_ns: now_ns(),
            children: Vec::new(),
        }
    }

    /// Convert to the flat record sent to clients.
    pub fn to_file_info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            size: self.size,
            mode: if self.is_dir { DIR_MODE } else { FILE_MODE },
            mtime_ns: self.mtime_ns,
            is_dir: self.is_dir,
            owner: self.owner,
        }
    }
}

/// The namespace tree. Owns the root node; all mutation goes through the
/// methods below, which maintain the name-uniqueness and path invariants.
#[derive(Debug)]
pub struct NamespaceTree {
    root: NsNode,
}

impl NamespaceTree {
    pub fn new() -> Self {
        Self {
            root: NsNode::root(),
        }
    }

    /// Resolve a cleaned path to its node, walking from the root by exact
    /// child-name match. The root path resolves to the root itself.
    pub fn resolve(&self, path: &str) -> Result<&NsNode> {
        let cleaned = clean_path(path);
        if cleaned == ROOT_PATH {
            return Ok(&self.root);
        }

        let mut current = &self.root;
        for segment in cleaned.split('/') {
            if !current.is_dir {
                return make_error_msg(
                    MetaCode::NOT_DIRECTORY,
                    format!("{} is not a directory", current.path),
                );
            }
            current = current
                .children
                .iter()
                .find(|c| c.name == segment)
                .ok_or_else(|| {
                    tdfs_types::Status::with_message(
                        MetaCode::NOT_FOUND,
                        format!("no such entry: {} (while resolving {})", segment, cleaned),
                    )
                })?;
        }
        Ok(current)
    }

    fn resolve_mut(&mut self, path: &str) -> Result<&mut NsNode> {
        let cleaned = clean_path(path);
        if cleaned == ROOT_PATH {
            return Ok(&mut self.root);
        }

        let mut current = &mut self.root;
        for segment in cleaned.split('/') {
            if !current.is_dir {
                return make_error_msg(
                    MetaCode::NOT_DIRECTORY,
                    format!("{} is not a directory", current.path),
                );
            }
            current = current
                .children
                .iter_mut()
                .find(|c| c.name == segment)
                .ok_or_else(|| {
                    tdfs_types::Status::with_message(
                        MetaCode::NOT_FOUND,
                        format!("no such entry: {} (while resolving {})", segment, cleaned),
                    )
                })?;
        }
        Ok(current)
    }

    /// Append `node` to the children of the directory at `parent_path`.
    ///
    /// Fails without mutating the tree if the parent is missing, is a file,
    /// or already has a child with the same name.
    pub fn insert(&mut self, parent_path: &str, node: NsNode) -> Result<()> {
        let parent = self.resolve_mut(parent_path)?;
        if !parent.is_dir {
            return make_error_msg(
                MetaCode::NOT_DIRECTORY,
                format!("{} is not a directory", parent.path),
            );
        }
        if parent.children.iter().any(|c| c.name == node.name) {
            return make_error_msg(
                MetaCode::EXISTS,
                format!("entry already exists: {}", node.path),
            );
        }
        parent.children.push(node);
        Ok(())
    }

    /// List the children of the directory at `path`, in insertion order.
    pub fn list(&self, path: &str) -> Result<&[NsNode]> {
        let node = self.resolve(path)?;
        if !node.is_dir {
            return make_error_msg(
                MetaCode::NOT_DIRECTORY,
                format!("{} is not a directory", node.path),
            );
        }
        Ok(&node.children)
    }

    /// Replace the tree with a fresh empty root. O(1); every outstanding
    /// listing is implicitly invalidated.
    pub fn reset(&mut self) {
        self.root = NsNode::root();
    }
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}
