//! Typed client stub for storage nodes.
//!
//! Unlike the metadata stub, storage calls carry the target node address
//! per call: the metadata service decides placement, the client then talks
//! to whichever node owns the file.

use async_trait::async_trait;
use tdfs_net::{AsyncConnector, RpcClient};
use tdfs_net_tcp::{TcpConnector, TcpSocket};
use tdfs_proto::storage::{
    method, CreateFileReq, CreateFileRsp, GetFileReq, GetFileRsp, GrepReq, GrepRsp, PingReq,
    PingRsp, SERVICE_ID,
};
use tdfs_proto::{envelope, from_wire, to_wire, WireDeserialize, WireSerialize};
use tdfs_types::Address;

use crate::error::{ClientError, ClientResult};

/// Storage node operations as seen by the client.
#[async_trait]
pub trait StorageStub: Send + Sync {
    /// Echo a challenge off a storage node.
    async fn ping(&self, node: Address, challenge: u64) -> ClientResult<u64>;

    /// Upload a whole file to the given node.
    async fn create_file(&self, node: Address, name: &str, data: Vec<u8>) -> ClientResult<u64>;

    /// Download a whole file from the given node.
    async fn get_file(&self, node: Address, name: &str) -> ClientResult<Vec<u8>>;

    /// Count word occurrences in a file without transferring its bytes.
    async fn grep(&self, node: Address, name: &str, word: &str) -> ClientResult<u64>;
}

/// A [`StorageStub`] speaking the tdfs RPC protocol over TCP. Connections
/// are cached per node address.
pub struct RemoteStorageStub {
    client: RpcClient<TcpSocket>,
    connector: TcpConnector,
}

impl RemoteStorageStub {
    pub fn new() -> Self {
        Self {
            client: RpcClient::default(),
            connector: TcpConnector::new(),
        }
    }

    async fn call<Req, Rsp>(&self, node: Address, method_id: u16, req: &Req) -> ClientResult<Rsp>
    where
        Req: WireSerialize + Sync,
        Rsp: WireDeserialize,
    {
        let body = to_wire(req).map_err(|e| ClientError::Internal(e.to_string()))?;
        let reply = self
            .client
            .call(
                node,
                SERVICE_ID,
                method_id,
                &body,
                &self.connector as &dyn AsyncConnector<TcpSocket>,
            )
            .await?;
        let rsp_body = envelope::decode_reply(&reply)?;
        from_wire(&rsp_body).map_err(|e| ClientError::Internal(e.to_string()))
    }
}

impl Default for RemoteStorageStub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageStub for RemoteStorageStub {
    async fn ping(&self, node: Address, challenge: u64) -> ClientResult<u64> {
        let rsp: PingRsp = self.call(node, method::PING, &PingReq { challenge }).await?;
        Ok(rsp.challenge)
    }

    async fn create_file(&self, node: Address, name: &str, data: Vec<u8>) -> ClientResult<u64> {
        let rsp: CreateFileRsp = self
            .call(
                node,
                method::CREATE_FILE,
                &CreateFileReq {
                    name: name.to_string(),
                    data,
                },
            )
            .await?;
        Ok(rsp.bytes_written)
    }

    async fn get_file(&self, node: Address, name: &str) -> ClientResult<Vec<u8>> {
        let rsp: GetFileRsp = self
            .call(
                node,
                method::GET_FILE,
                &GetFileReq {
                    name: name.to_string(),
                },
            )
            .await?;
        Ok(rsp.data)
    }

    async fn grep(&self, node: Address, name: &str, word: &str) -> ClientResult<u64> {
        let rsp: GrepRsp = self
            .call(
                node,
                method::GREP,
                &GrepReq {
                    name: name.to_string(),
                    word: word.to_string(),
                },
            )
            .await?;
        Ok(rsp.count)
    }
}
