//! Typed client stub for the metadata service.
//!
//! The [`MetaStub`] trait is the seam between the caching/traversal logic
//! and the wire: production code uses [`RemoteMetaStub`] over TCP, tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use tdfs_net::{AsyncConnector, RpcClient};
use tdfs_net_tcp::{TcpConnector, TcpSocket};
use tdfs_proto::meta::{
    method, DeleteAllReq, DeleteAllRsp, GetLocationReq, GetLocationRsp, MkdirReq, MkdirRsp,
    OpenDirReq, OpenDirRsp, PingReq, PingRsp, ReadDirAllReq, ReadDirAllRsp, ReadDirEntryReq,
    ReadDirEntryRsp, RegisterFileReq, RegisterFileRsp, SERVICE_ID,
};
use tdfs_proto::{envelope, from_wire, to_wire, FileInfo, WireDeserialize, WireSerialize};
use tdfs_types::status_code::MetaCode;
use tdfs_types::Address;

use crate::error::{ClientError, ClientResult};

/// Metadata operations as seen by the client.
///
/// `read_dir_entry` folds the end-of-directory sentinel into `Ok(None)` so
/// iteration loops terminate without matching on status codes.
#[async_trait]
pub trait MetaStub: Send + Sync {
    /// Echo a challenge off the metadata service.
    async fn ping(&self, challenge: u64) -> ClientResult<u64>;

    /// Create a directory; returns its canonical path.
    async fn mkdir(&self, path: &str) -> ClientResult<String>;

    /// Reserve a placement for a new file; returns the chosen storage node.
    async fn register_file_creation(&self, path: &str, size: u64) -> ClientResult<Address>;

    /// Look up the storage node owning a file.
    async fn get_location(&self, path: &str) -> ClientResult<Address>;

    /// Validate a directory and return its handle (canonical path).
    async fn open_dir(&self, path: &str) -> ClientResult<String>;

    /// Read one directory entry by index; `Ok(None)` past the end.
    async fn read_dir_entry(&self, handle: &str, index: i64) -> ClientResult<Option<FileInfo>>;

    /// Fetch the entire directory listing in one call.
    async fn read_dir_all(&self, handle: &str) -> ClientResult<Vec<FileInfo>>;

    /// Reset the namespace (test/benchmark isolation).
    async fn delete_all_data(&self) -> ClientResult<()>;
}

/// A [`MetaStub`] speaking the tdfs RPC protocol over TCP.
pub struct RemoteMetaStub {
    addr: Address,
    client: RpcClient<TcpSocket>,
    connector: TcpConnector,
}

impl RemoteMetaStub {
    pub fn new(addr: Address) -> Self {
        Self {
            addr,
            client: RpcClient::default(),
            connector: TcpConnector::new(),
        }
    }

    /// Address of the metadata service this stub talks to.
    pub fn addr(&self) -> Address {
        self.addr
    }

    async fn call<Req, Rsp>(&self, method_id: u16, req: &Req) -> ClientResult<Rsp>
    where
        Req: WireSerialize + Sync,
        Rsp: WireDeserialize,
    {
        let body = to_wire(req).map_err(|e| ClientError::Internal(e.to_string()))?;
        let reply = self
            .client
            .call(
                self.addr,
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

#[async_trait]
impl MetaStub for RemoteMetaStub {
    async fn ping(&self, challenge: u64) -> ClientResult<u64> {
        let rsp: PingRsp = self.call(method::PING, &PingReq { challenge }).await?;
        Ok(rsp.challenge)
    }

    async fn mkdir(&self, path: &str) -> ClientResult<String> {
        let rsp: MkdirRsp = self
            .call(
                method::MKDIR,
                &MkdirReq {
                    path: path.to_string(),
                },
            )
            .await?;
        Ok(rsp.path)
    }

    async fn register_file_creation(&self, path: &str, size: u64) -> ClientResult<Address> {
        let rsp: RegisterFileRsp = self
            .call(
                method::REGISTER_FILE_CREATION,
                &RegisterFileReq {
                    path: path.to_string(),
                    size,
                },
            )
            .await?;
        Ok(rsp.node)
    }

    async fn get_location(&self, path: &str) -> ClientResult<Address> {
        let rsp: GetLocationRsp = self
            .call(
                method::GET_LOCATION,
                &GetLocationReq {
                    path: path.to_string(),
                },
            )
            .await?;
        Ok(rsp.node)
    }

    async fn open_dir(&self, path: &str) -> ClientResult<String> {
        let rsp: OpenDirRsp = self
            .call(
                method::OPEN_DIR,
                &OpenDirReq {
                    path: path.to_string(),
                },
            )
            .await?;
        Ok(rsp.handle)
    }

    async fn read_dir_entry(&self, handle: &str, index: i64) -> ClientResult<Option<FileInfo>> {
        let result: ClientResult<ReadDirEntryRsp> = self
            .call(
                method::READ_DIR_ENTRY,
                &ReadDirEntryReq {
                    handle: handle.to_string(),
                    index,
                },
            )
            .await;

        match result {
            Ok(rsp) => Ok(Some(rsp.entry)),
            // The sentinel is normal loop termination, not an error.
            Err(ClientError::Status(s)) if s.code() == MetaCode::END_OF_DIRECTORY => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read_dir_all(&self, handle: &str) -> ClientResult<Vec<FileInfo>> {
        let rsp: ReadDirAllRsp = self
            .call(
                method::READ_DIR_ALL,
                &ReadDirAllReq {
                    handle: handle.to_string(),
                },
            )
            .await?;
        Ok(rsp.entries)
    }

    async fn delete_all_data(&self) -> ClientResult<()> {
        let _: DeleteAllRsp = self.call(method::DELETE_ALL_DATA, &DeleteAllReq {}).await?;
        Ok(())
    }
}
