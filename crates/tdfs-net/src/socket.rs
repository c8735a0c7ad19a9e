use async_trait::async_trait;
use bytes::Bytes;
use tdfs_types::Address;

use crate::error::NetError;

/// A bidirectional message socket.
///
/// `recv` must return one complete framed message (header + payload) per
/// call. Stream-oriented transports are expected to perform the
/// length-delimited reads internally (see `tdfs-net-tcp`).
#[async_trait]
pub trait Socket: Send + Sync {
    async fn send(&self, data: Bytes) -> Result<(), NetError>;
    async fn recv(&self) -> Result<Bytes, NetError>;
    fn peer_addr(&self) -> Address;
    fn local_addr(&self) -> Address;
    async fn close(&self);
}

/// A listener that accepts incoming connections of a concrete socket type.
#[async_trait]
pub trait Listener: Send + Sync {
    type Conn: Socket + 'static;

    async fn accept(&self) -> Result<Self::Conn, NetError>;
    fn local_addr(&self) -> Address;
}
