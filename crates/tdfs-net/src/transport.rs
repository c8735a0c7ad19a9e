use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tdfs_types::Address;

use crate::error::NetError;
use crate::message::{MessageHeader, MESSAGE_HEADER_SIZE, MESSAGE_MAX_SIZE};
use crate::socket::Socket;

// ---------------------------------------------------------------------------
// AsyncConnector
// ---------------------------------------------------------------------------

/// Trait for types that can establish new connections to a remote address.
#[async_trait]
pub trait AsyncConnector<S: Socket>: Send + Sync {
    async fn connect(&self, addr: Address) -> Result<S, NetError>;
}

// ---------------------------------------------------------------------------
// Message framing helpers
// ---------------------------------------------------------------------------

/// Frame a payload with a `MessageHeader` and send it over a socket.
///
/// The on-wire format is:
/// ```text
/// [checksum: 4 bytes LE][size: 4 bytes LE][payload: `size` bytes]
/// ```
pub async fn send_message<S: Socket>(socket: &S, payload: &[u8]) -> Result<(), NetError> {
    if payload.len() > MESSAGE_MAX_SIZE {
        return Err(NetError::MessageTooLarge {
            size: payload.len(),
            max: MESSAGE_MAX_SIZE,
        });
    }

    let header = MessageHeader::for_payload(payload);

    let mut frame = Vec::with_capacity(MESSAGE_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(payload);

    socket.send(Bytes::from(frame)).await
}

/// Read a framed message from a socket and validate its header.
///
/// Returns the payload bytes (without the header). The checksum and magic
/// number are verified; any mismatch returns an appropriate `NetError`.
pub async fn recv_message<S: Socket>(socket: &S) -> Result<Bytes, NetError> {
    let data = socket.recv().await?;

    if data.is_empty() {
        return Err(NetError::ConnectionClosed);
    }

    if data.len() < MESSAGE_HEADER_SIZE {
        return Err(NetError::IncompleteHeader {
            need: MESSAGE_HEADER_SIZE,
            have: data.len(),
        });
    }

    let header_bytes: [u8; MESSAGE_HEADER_SIZE] = data[..MESSAGE_HEADER_SIZE]
        .try_into()
        .expect("slice length verified above");
    let header = MessageHeader::from_bytes(&header_bytes);

    let payload = &data[MESSAGE_HEADER_SIZE..];

    let declared_size = header.size as usize;
    if payload.len() < declared_size {
        return Err(NetError::IncompleteHeader {
            need: MESSAGE_HEADER_SIZE + declared_size,
            have: data.len(),
        });
    }

    let payload = &payload[..declared_size];
    header.validate(payload)?;

    Ok(Bytes::copy_from_slice(payload))
}

// ---------------------------------------------------------------------------
// Transport (connection cache)
// ---------------------------------------------------------------------------

/// Manages a cache of open connections keyed by remote address.
///
/// One connection per address; concurrent callers share the cached socket.
pub struct Transport<S: Socket> {
    connections: DashMap<Address, Arc<S>>,
}

impl<S: Socket> Transport<S> {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Retrieve an existing connection or establish a new one via
    /// `connector`.
    pub async fn get_or_connect(
        &self,
        addr: Address,
        connector: &(dyn AsyncConnector<S> + '_),
    ) -> Result<Arc<S>, NetError> {
        // Fast path: return cached connection.
        if let Some(entry) = self.connections.get(&addr) {
            return Ok(Arc::clone(entry.value()));
        }

        // Slow path: connect and cache.
        let socket = connector.connect(addr).await?;
        let arc = Arc::new(socket);
        self.connections.insert(addr, Arc::clone(&arc));
        Ok(arc)
    }

    /// Remove a connection from the cache.
    pub fn remove(&self, addr: &Address) {
        self.connections.remove(addr);
    }

    /// Remove all connections from the cache.
    pub fn clear(&self) {
        self.connections.clear();
    }

    /// Return the number of cached connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Return whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl<S: Socket> Default for Transport<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockSocket};
    use std::sync::atomic::Ordering;
    use tdfs_types::AddressType;

    #[tokio::test]
    async fn test_get_or_connect_caches() {
        let transport = Transport::<MockSocket>::new();
        let connector = MockConnector::new();
        let addr = Address::from_octets(10, 0, 0, 1, 8080, AddressType::TCP);

        let s1 = transport.get_or_connect(addr, &connector).await.unwrap();
        let s2 = transport.get_or_connect(addr, &connector).await.unwrap();

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[tokio::test]
    async fn test_remove() {
        let transport = Transport::<MockSocket>::new();
        let connector = MockConnector::new();
        let addr = Address::from_octets(10, 0, 0, 1, 8080, AddressType::TCP);

        let _ = transport.get_or_connect(addr, &connector).await.unwrap();
        transport.remove(&addr);
        let _ = transport.get_or_connect(addr, &connector).await.unwrap();

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let transport = Transport::<MockSocket>::new();
        let connector = MockConnector::new();

        let addr1 = Address::from_octets(10, 0, 0, 1, 8080, AddressType::TCP);
        let addr2 = Address::from_octets(10, 0, 0, 2, 8080, AddressType::TCP);

        let _ = transport.get_or_connect(addr1, &connector).await.unwrap();
        let _ = transport.get_or_connect(addr2, &connector).await.unwrap();
        assert_eq!(transport.len(), 2);

        transport.clear();
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_send_message_framing() {
        let socket = MockSocket::new(Address::localhost(5000));
        let payload = b"hello, world!";

        send_message(&socket, payload).await.unwrap();

        let sent = socket.take_sent();
        assert_eq!(sent.len(), 1);

        let frame = &sent[0];
        assert_eq!(frame.len(), MESSAGE_HEADER_SIZE + payload.len());

        let header_bytes: [u8; MESSAGE_HEADER_SIZE] =
            frame[..MESSAGE_HEADER_SIZE].try_into().unwrap();
        let header = MessageHeader::from_bytes(&header_bytes);
        assert!(header.is_tdfs_message());
        assert_eq!(header.size as usize, payload.len());
        assert_eq!(&frame[MESSAGE_HEADER_SIZE..], &payload[..]);
        assert!(header.validate(payload).is_ok());
    }

    #[tokio::test]
    async fn test_send_message_too_large() {
        let socket = MockSocket::new(Address::localhost(5000));
        let payload = vec![0u8; MESSAGE_MAX_SIZE + 1];

        let result = send_message(&socket, &payload).await;
        assert!(matches!(
            result.unwrap_err(),
            NetError::MessageTooLarge { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_recv_roundtrip() {
        let addr = Address::localhost(5000);
        let payload = b"roundtrip payload test";

        let send_socket = MockSocket::new(addr);
        send_message(&send_socket, payload).await.unwrap();
        let sent = send_socket.take_sent();

        let recv_socket = MockSocket::with_recv_data(addr, sent);
        let received = recv_message(&recv_socket).await.unwrap();

        assert_eq!(received.as_ref(), payload);
    }

    #[tokio::test]
    async fn test_recv_message_empty_frame() {
        let socket = MockSocket::with_recv_data(Address::localhost(5000), vec![Bytes::new()]);
        let result = recv_message(&socket).await;
        assert!(matches!(result.unwrap_err(), NetError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_recv_message_incomplete_header() {
        let socket = MockSocket::with_recv_data(
            Address::localhost(5000),
            vec![Bytes::from_static(&[0, 1, 2])],
        );
        let result = recv_message(&socket).await;
        assert!(matches!(
            result.unwrap_err(),
            NetError::IncompleteHeader { need: 8, have: 3 }
        ));
    }

    #[tokio::test]
    async fn test_recv_message_bad_checksum() {
        let payload = b"test data";
        let mut header = MessageHeader::for_payload(payload);
        header.checksum ^= 0xFF00_0000;

        let mut frame = Vec::new();
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(payload);

        let socket =
            MockSocket::with_recv_data(Address::localhost(5000), vec![Bytes::from(frame)]);
        let result = recv_message(&socket).await;
        assert!(matches!(
            result.unwrap_err(),
            NetError::ChecksumMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn test_recv_message_bad_magic() {
        let mut frame = vec![0u8; MESSAGE_HEADER_SIZE];
        frame[0..4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        frame[4..8].copy_from_slice(&0u32.to_le_bytes());

        let socket =
            MockSocket::with_recv_data(Address::localhost(5000), vec![Bytes::from(frame)]);
        let result = recv_message(&socket).await;
        assert!(matches!(result.unwrap_err(), NetError::InvalidMagic(0x78)));
    }
}
