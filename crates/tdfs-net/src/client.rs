use bytes::{BufMut, Bytes, BytesMut};
use tdfs_types::Address;

use crate::error::NetError;
use crate::server::REQUEST_ENVELOPE_SIZE;
use crate::socket::Socket;
use crate::transport::{recv_message, send_message, AsyncConnector, Transport};

/// An RPC client that sends requests over a `Transport`.
///
/// Requests are framed with a `MessageHeader`. The body layout is
/// `[service_id: u16 LE][method_id: u16 LE][payload...]`; the response
/// payload is the `[status][body]` reply envelope produced by the server.
pub struct RpcClient<S: Socket> {
    transport: Transport<S>,
}

impl<S: Socket> RpcClient<S> {
    pub fn new(transport: Transport<S>) -> Self {
        Self { transport }
    }

    /// Send an RPC request to `addr` and wait for the response payload.
    ///
    /// The `connector` is used to establish a new connection if one is not
    /// already cached in the underlying transport. A connection that fails
    /// mid-call is dropped from the cache so the next call reconnects.
    pub async fn call(
        &self,
        addr: Address,
        service_id: u16,
        method_id: u16,
        request: &[u8],
        connector: &(dyn AsyncConnector<S> + '_),
    ) -> Result<Bytes, NetError> {
        let socket = self.transport.get_or_connect(addr, connector).await?;

        let mut envelope = BytesMut::with_capacity(REQUEST_ENVELOPE_SIZE + request.len());
        envelope.put_u16_le(service_id);
        envelope.put_u16_le(method_id);
        envelope.extend_from_slice(request);

        let result = async {
            send_message(socket.as_ref(), &envelope).await?;
            recv_message(socket.as_ref()).await
        }
        .await;

        if result.is_err() {
            self.transport.remove(&addr);
        }
        result
    }

    /// Return a reference to the underlying transport.
    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }
}

impl<S: Socket> Default for RpcClient<S> {
    fn default() -> Self {
        Self::new(Transport::new())
    }
}
