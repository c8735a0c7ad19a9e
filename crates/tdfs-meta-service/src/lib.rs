//! The tdfs metadata service: the namespace/placement authority.
//!
//! Holds the in-memory namespace tree and the storage-node placement
//! tracker, and exposes them over RPC. Every handler operates on an
//! explicitly owned [`service::MetaServiceImpl`] instance (never a
//! process-wide singleton) so tests can construct isolated services.

pub mod handler;
pub mod namespace;
pub mod pinger;
pub mod placement;
pub mod service;

pub use handler::MetaServiceHandler;
pub use pinger::{NodePinger, RpcNodePinger};
pub use service::{MetaService, MetaServiceImpl};
