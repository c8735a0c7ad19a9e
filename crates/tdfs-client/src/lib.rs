//! The tdfs client library.
//!
//! Talks to the metadata service for namespace/placement operations and
//! directly to storage nodes for byte transfer. On top of the raw RPC
//! stubs it layers two optimizations:
//!
//! - a per-directory listing cache driven by an access-frequency predictor
//!   ([`cache`]): directories read often enough within a sliding window are
//!   promoted from per-entry reads to one bulk listing fetch;
//! - a work-stealing parallel directory traversal ([`walk`]): a fixed pool
//!   of workers consumes a shared queue of pending directories, which
//!   bounds concurrency regardless of tree shape.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod meta;
pub mod storage;
pub mod walk;

#[cfg(test)]
mod e2e;

pub use client::DfsClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use meta::{MetaStub, RemoteMetaStub};
pub use storage::{RemoteStorageStub, StorageStub};
pub use walk::{distributed_grep, walk_sequential, FileVisitor, WalkStats, Walker};
