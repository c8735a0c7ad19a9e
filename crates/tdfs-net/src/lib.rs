//! Transport-agnostic RPC plumbing for tdfs.
//!
//! Messages are framed with a [`message::MessageHeader`] (CRC32C checksum
//! with a magic byte, plus payload size). Requests carry a
//! `[service_id][method_id]` envelope dispatched by the [`server::Server`]
//! to registered [`service::ServiceHandler`]s; responses are wrapped in the
//! `[status][body]` reply envelope from `tdfs_proto::envelope`.

pub mod client;
pub mod error;
pub mod message;
pub mod server;
pub mod service;
pub mod socket;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RpcClient;
pub use error::NetError;
pub use server::Server;
pub use service::{ServiceHandler, ServiceRegistry};
pub use socket::{Listener, Socket};
pub use transport::{AsyncConnector, Transport};
