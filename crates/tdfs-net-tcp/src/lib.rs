//! TCP transport implementation for the tdfs networking layer.
//!
//! Provides [`TcpSocket`] and [`TcpListener`] which wrap Tokio's TCP
//! primitives and implement the [`tdfs_net::Socket`] and
//! [`tdfs_net::Listener`] traits.
//!
//! The socket splits a `TcpStream` into independent read/write halves so
//! that sending and receiving can proceed concurrently without holding a
//! single lock over the entire stream. `recv` performs the length-delimited
//! read itself: exactly one 8-byte message header followed by exactly
//! `size` payload bytes, so the generic framing validation in
//! `tdfs_net::transport` always sees one complete frame per call.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tdfs_net::error::NetError;
use tdfs_net::message::{MessageHeader, MESSAGE_HEADER_SIZE, MESSAGE_MAX_SIZE};
use tdfs_net::socket::{Listener, Socket};
use tdfs_net::transport::AsyncConnector;
use tdfs_types::{Address, AddressType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Helpers for converting between tdfs Address and std SocketAddr
// ---------------------------------------------------------------------------

fn address_to_socket_addr(addr: &Address) -> SocketAddr {
    let octets = addr.octets();
    SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
        addr.port,
    ))
}

fn socket_addr_to_address(sa: SocketAddr) -> Address {
    match sa {
        SocketAddr::V4(v4) => {
            let octets = v4.ip().octets();
            Address::from_octets(octets[0], octets[1], octets[2], octets[3], v4.port(), AddressType::TCP)
        }
        SocketAddr::V6(v6) => {
            // Map IPv6-mapped-IPv4 addresses; anything else loses its IP.
            if let Some(v4) = v6.ip().to_ipv4_mapped() {
                let octets = v4.octets();
                Address::from_octets(octets[0], octets[1], octets[2], octets[3], v6.port(), AddressType::TCP)
            } else {
                Address::new(0, v6.port(), AddressType::TCP)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TcpSocket
// ---------------------------------------------------------------------------

/// A TCP socket wrapping a Tokio [`TcpStream`](tokio::net::TcpStream).
///
/// The underlying stream is split into independent read and write halves
/// that are each protected by an async mutex, allowing concurrent send/recv
/// from different tasks.
pub struct TcpSocket {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    peer_addr: Address,
    local_addr: Address,
}

impl TcpSocket {
    /// Wrap an already-connected [`tokio::net::TcpStream`].
    pub fn from_stream(stream: tokio::net::TcpStream) -> Result<Self, NetError> {
        let peer_sa = stream.peer_addr()?;
        let local_sa = stream.local_addr()?;

        let peer_addr = socket_addr_to_address(peer_sa);
        let local_addr = socket_addr_to_address(local_sa);

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: Arc::new(Mutex::new(read_half)),
            writer: Arc::new(Mutex::new(write_half)),
            peer_addr,
            local_addr,
        })
    }

    /// Send raw bytes over the socket.
    pub async fn send_bytes(&self, data: &[u8]) -> Result<(), NetError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read exactly one framed message (header + payload) from the stream.
    ///
    /// Returns the raw frame bytes including the header; the generic
    /// `recv_message` helper performs checksum validation on top. EOF at a
    /// frame boundary surfaces as `ConnectionClosed`.
    async fn recv_frame(&self) -> Result<Bytes, NetError> {
        let mut reader = self.reader.lock().await;

        let mut header_bytes = [0u8; MESSAGE_HEADER_SIZE];
        match reader.read_exact(&mut header_bytes).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(NetError::ConnectionClosed);
            }
            Err(e) => return Err(e.into()),
        }

        let header = MessageHeader::from_bytes(&header_bytes);
        let size = header.size as usize;
        if size > MESSAGE_MAX_SIZE {
            return Err(NetError::MessageTooLarge {
                size,
                max: MESSAGE_MAX_SIZE,
            });
        }

        let mut frame = BytesMut::zeroed(MESSAGE_HEADER_SIZE + size);
        frame[..MESSAGE_HEADER_SIZE].copy_from_slice(&header_bytes);
        reader.read_exact(&mut frame[MESSAGE_HEADER_SIZE..]).await?;
        Ok(frame.freeze())
    }

    /// Return the remote peer address.
    pub fn peer_address(&self) -> Address {
        self.peer_addr
    }

    /// Return the local bind address.
    pub fn local_address(&self) -> Address {
        self.local_addr
    }

    /// Shut down the socket.
    pub async fn shutdown(&self) {
        // Attempt to shut down the write half; ignore errors (e.g. already
        // closed).
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket")
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[async_trait]
impl Socket for TcpSocket {
    async fn send(&self, data: Bytes) -> Result<(), NetError> {
        self.send_bytes(&data).await
    }

    async fn recv(&self) -> Result<Bytes, NetError> {
        self.recv_frame().await
    }

    fn peer_addr(&self) -> Address {
        self.peer_addr
    }

    fn local_addr(&self) -> Address {
        self.local_addr
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}

// ---------------------------------------------------------------------------
// TcpListener
// ---------------------------------------------------------------------------

/// A TCP listener wrapping [`tokio::net::TcpListener`].
pub struct TcpListener {
    inner: tokio::net::TcpListener,
    local_addr: Address,
}

impl TcpListener {
    /// Bind to the given [`Address`].
    pub async fn bind(addr: Address) -> Result<Self, NetError> {
        let sa = address_to_socket_addr(&addr);
        let listener = tokio::net::TcpListener::bind(sa).await?;

        // Resolve the actual local address (port may differ if 0 was
        // requested).
        let actual_sa = listener.local_addr()?;
        let local_addr = socket_addr_to_address(actual_sa);

        tracing::info!(%local_addr, "TCP listener bound");

        Ok(Self {
            inner: listener,
            local_addr,
        })
    }

    /// Accept the next incoming connection.
    pub async fn accept_tcp(&self) -> Result<TcpSocket, NetError> {
        let (stream, peer_sa) = self.inner.accept().await?;
        tracing::debug!(peer = %peer_sa, "accepted TCP connection");
        TcpSocket::from_stream(stream)
    }

    /// Return the local address the listener is bound to.
    pub fn local_address(&self) -> Address {
        self.local_addr
    }
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpSocket;

    async fn accept(&self) -> Result<TcpSocket, NetError> {
        self.accept_tcp().await
    }

    fn local_addr(&self) -> Address {
        self.local_addr
    }
}

impl std::fmt::Debug for TcpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpListener")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// connect() free function and AsyncConnector
// ---------------------------------------------------------------------------

/// Connect to a remote address and return a [`TcpSocket`].
pub async fn connect(addr: Address) -> Result<TcpSocket, NetError> {
    let sa = address_to_socket_addr(&addr);
    tracing::debug!(%addr, "connecting via TCP");
    let stream = tokio::net::TcpStream::connect(sa).await?;
    TcpSocket::from_stream(stream)
}

/// A connector that creates [`TcpSocket`] instances by opening TCP
/// connections, for use with [`tdfs_net::Transport`].
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AsyncConnector<TcpSocket> for TcpConnector {
    async fn connect(&self, addr: Address) -> Result<TcpSocket, NetError> {
        crate::connect(addr).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tdfs_net::transport::{recv_message, send_message};

    #[test]
    fn test_address_conversion_roundtrip() {
        let addr = Address::from_octets(192, 168, 1, 42, 9090, AddressType::TCP);
        let sa = address_to_socket_addr(&addr);
        assert_eq!(sa.to_string(), "192.168.1.42:9090");

        let back = socket_addr_to_address(sa);
        assert_eq!(back.octets(), [192, 168, 1, 42]);
        assert_eq!(back.port, 9090);
        assert_eq!(back.addr_type, AddressType::TCP);
    }

    #[test]
    fn test_address_v6_mapped() {
        let sa: SocketAddr = "[::ffff:10.0.0.1]:8080".parse().unwrap();
        let addr = socket_addr_to_address(sa);
        assert_eq!(addr.octets(), [10, 0, 0, 1]);
        assert_eq!(addr.port, 8080);
    }

    #[tokio::test]
    async fn test_listener_bind_and_local_addr() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let local = listener.local_address();
        assert_eq!(local.octets(), [127, 0, 0, 1]);
        // Port should have been assigned by the OS (nonzero).
        assert_ne!(local.port, 0);
    }

    #[tokio::test]
    async fn test_connect_and_accept() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });
        let client = connect(server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        assert_eq!(client.peer_address(), server_addr);
        assert_eq!(server_socket.local_address(), server_addr);
        assert_eq!(server_socket.peer_address(), client.local_address());
    }

    #[tokio::test]
    async fn test_framed_send_recv() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });
        let client = connect(server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        send_message(&client, b"hello from the client").await.unwrap();
        let received = recv_message(&server_socket).await.unwrap();
        assert_eq!(received.as_ref(), b"hello from the client");

        send_message(&server_socket, b"response from server").await.unwrap();
        let received = recv_message(&client).await.unwrap();
        assert_eq!(received.as_ref(), b"response from server");
    }

    #[tokio::test]
    async fn test_two_frames_in_one_write_are_split() {
        // Even when the peer's kernel delivers two frames in one TCP
        // segment, recv must return them one at a time.
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });
        let client = connect(server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        let mut combined = Vec::new();
        for payload in [&b"first"[..], &b"second"[..]] {
            let header = MessageHeader::for_payload(payload);
            combined.extend_from_slice(&header.to_bytes());
            combined.extend_from_slice(payload);
        }
        client.send_bytes(&combined).await.unwrap();

        let first = recv_message(&server_socket).await.unwrap();
        assert_eq!(first.as_ref(), b"first");
        let second = recv_message(&server_socket).await.unwrap();
        assert_eq!(second.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_large_payload() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });
        let client = connect(server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        // 1 MiB payload crosses many TCP segments.
        let payload: Vec<u8> = (0..1_000_000).map(|i| (i % 251) as u8).collect();

        let payload_clone = payload.clone();
        let send_handle =
            tokio::spawn(async move { send_message(&client, &payload_clone).await.unwrap() });

        let received = recv_message(&server_socket).await.unwrap();
        send_handle.await.unwrap();

        assert_eq!(received.len(), payload.len());
        assert_eq!(received.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_close_signals_connection_closed() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });
        let client = connect(server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        client.shutdown().await;

        let result = recv_message(&server_socket).await;
        assert!(matches!(result.unwrap_err(), NetError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind and then drop the listener so the port is closed.
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let addr = listener.local_address();
        drop(listener);

        let result = connect(addr).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tcp_connector() {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        let server_addr = listener.local_address();

        let accept_handle = tokio::spawn(async move { listener.accept_tcp().await.unwrap() });

        let connector = TcpConnector::new();
        let client = AsyncConnector::connect(&connector, server_addr).await.unwrap();
        let server_socket = accept_handle.await.unwrap();

        send_message(&client, b"via connector").await.unwrap();
        let received = recv_message(&server_socket).await.unwrap();
        assert_eq!(received.as_ref(), b"via connector");
    }
}
