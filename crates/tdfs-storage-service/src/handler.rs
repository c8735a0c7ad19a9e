//! RPC adapter exposing a [`StorageService`] through
//! `tdfs_net::ServiceHandler`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::service::StorageService;
use tdfs_proto::storage::{self, method};
use tdfs_proto::{envelope, from_wire, to_wire, WireDeserialize, WireSerialize};
use tdfs_types::status_code::{RPCCode, StatusCode};
use tdfs_types::{Result, Status};

fn decode<T: WireDeserialize>(request: &Bytes) -> Result<T> {
    from_wire(request).map_err(envelope::decode_error)
}

fn encode<T: WireSerialize>(rsp: &T) -> Result<Bytes> {
    to_wire(rsp)
        .map(Bytes::from)
        .map_err(|e| Status::with_message(StatusCode::INVALID_FORMAT, e.to_string()))
}

/// Dispatches storage RPC methods to a service implementation.
pub struct StorageServiceHandler<S: StorageService> {
    service: Arc<S>,
}

impl<S: StorageService> StorageServiceHandler<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: StorageService + 'static> tdfs_net::ServiceHandler for StorageServiceHandler<S> {
    fn service_id(&self) -> u16 {
        storage::SERVICE_ID
    }

    fn service_name(&self) -> &str {
        "storage"
    }

    async fn handle(&self, method_id: u16, request: Bytes) -> Result<Bytes> {
        match method_id {
            method::PING => {
                let rsp = self.service.ping(decode(&request)?).await?;
                encode(&rsp)
            }
            method::CREATE_FILE => {
                let rsp = self.service.create_file(decode(&request)?).await?;
                encode(&rsp)
            }
            method::GET_FILE => {
                let rsp = self.service.get_file(decode(&request)?).await?;
                encode(&rsp)
            }
            method::GREP => {
                let rsp = self.service.grep(decode(&request)?).await?;
                encode(&rsp)
            }
            other => Err(Status::with_message(
                RPCCode::INVALID_METHOD_ID,
                format!("unknown storage method: {}", other),
            )),
        }
    }
}
