//! The liveness handshake used when a storage node registers.
//!
//! The service sends a random challenge value and requires the node to echo
//! it back unchanged before the node enters the registry. The trait seam
//! lets tests swap in misbehaving or unreachable nodes without a network.

use async_trait::async_trait;
use tdfs_net::{AsyncConnector, NetError, RpcClient};
use tdfs_net_tcp::{TcpConnector, TcpSocket};
use tdfs_proto::{envelope, from_wire, storage, to_wire};
use tdfs_types::status_code::RPCCode;
use tdfs_types::{Address, Result, Status};

/// Sends a challenge to a storage node and returns the echoed value.
#[async_trait]
pub trait NodePinger: Send + Sync {
    async fn ping(&self, addr: Address, challenge: u64) -> Result<u64>;
}

/// A [`NodePinger`] that issues a real storage-service `Ping` RPC over TCP.
pub struct RpcNodePinger {
    client: RpcClient<TcpSocket>,
    connector: TcpConnector,
}

impl RpcNodePinger {
    pub fn new() -> Self {
        Self {
            client: RpcClient::default(),
            connector: TcpConnector::new(),
        }
    }
}

impl Default for RpcNodePinger {
    fn default() -> Self {
        Self::new()
    }
}

fn net_status(err: NetError) -> Status {
    Status::with_message(RPCCode::SOCKET_ERROR, err.to_string())
}

#[async_trait]
impl NodePinger for RpcNodePinger {
    async fn ping(&self, addr: Address, challenge: u64) -> Result<u64> {
        let body = to_wire(&storage::PingReq { challenge })
            .map_err(|e| Status::with_message(RPCCode::SEND_FAILED, e.to_string()))?;

        let reply = self
            .client
            .call(
                addr,
                storage::SERVICE_ID,
                storage::method::PING,
                &body,
                &self.connector as &dyn AsyncConnector<TcpSocket>,
            )
            .await
            .map_err(net_status)?;

        let rsp_body = envelope::decode_reply(&reply)?;
        let rsp: storage::PingRsp = from_wire(&rsp_body).map_err(envelope::decode_error)?;
        Ok(rsp.challenge)
    }
}
