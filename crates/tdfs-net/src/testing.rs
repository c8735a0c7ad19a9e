//! Mock sockets and connectors shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tdfs_types::Address;

use crate::error::NetError;
use crate::socket::Socket;
use crate::transport::AsyncConnector;

/// A mock socket that records sent frames and replays a queue of received
/// frames.
pub(crate) struct MockSocket {
    peer: Address,
    sent: Mutex<Vec<Bytes>>,
    inbox: Mutex<VecDeque<Bytes>>,
    closed: AtomicBool,
}

impl MockSocket {
    pub(crate) fn new(peer: Address) -> Self {
        Self::with_recv_data(peer, Vec::new())
    }

    pub(crate) fn with_recv_data(peer: Address, data: Vec<Bytes>) -> Self {
        Self {
            peer,
            sent: Mutex::new(Vec::new()),
            inbox: Mutex::new(data.into()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl Socket for MockSocket {
    async fn send(&self, data: Bytes) -> Result<(), NetError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetError::ConnectionClosed);
        }
        self.sent.lock().push(data);
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes, NetError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetError::ConnectionClosed);
        }
        match self.inbox.lock().pop_front() {
            Some(data) => Ok(data),
            None => Err(NetError::ConnectionClosed),
        }
    }

    fn peer_addr(&self) -> Address {
        self.peer
    }

    fn local_addr(&self) -> Address {
        Address::localhost(0)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A connector that hands out [`MockSocket`]s, optionally pre-loaded with
/// frames to receive, and counts how often it was asked to connect.
pub(crate) struct MockConnector {
    pub(crate) call_count: AtomicUsize,
    responses: Mutex<Vec<Bytes>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub(crate) fn with_responses(responses: Vec<Bytes>) -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl AsyncConnector<MockSocket> for MockConnector {
    async fn connect(&self, addr: Address) -> Result<MockSocket, NetError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.lock().clone();
        Ok(MockSocket::with_recv_data(addr, responses))
    }
}
