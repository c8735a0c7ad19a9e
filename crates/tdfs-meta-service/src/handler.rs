//! RPC adapter exposing a [`MetaService`] through `tdfs_net::ServiceHandler`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::service::MetaService;
use tdfs_proto::meta::{self, method};
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

/// Dispatches metadata RPC methods to a service implementation.
pub struct MetaServiceHandler<S: MetaService> {
    service: Arc<S>,
}

impl<S: MetaService> MetaServiceHandler<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: MetaService + 'static> tdfs_net::ServiceHandler for MetaServiceHandler<S> {
    fn service_id(&self) -> u16 {
        meta::SERVICE_ID
    }

    fn service_name(&self) -> &str {
        "meta"
    }

    async fn handle(&self, method_id: u16, request: Bytes) -> Result<Bytes> {
        match method_id {
            method::PING => {
                let rsp = self.service.ping(decode(&request)?).await?;
                encode(&rsp)
            }
            method::MKDIR => {
                let rsp = self.service.mkdir(decode(&request)?).await?;
                encode(&rsp)
            }
            method::REGISTER_FILE_CREATION => {
                let rsp = self
                    .service
                    .register_file_creation(decode(&request)?)
                    .await?;
                encode(&rsp)
            }
            method::GET_LOCATION => {
                let rsp = self.service.get_location(decode(&request)?).await?;
                encode(&rsp)
            }
            method::OPEN_DIR => {
                let rsp = self.service.open_dir(decode(&request)?).await?;
                encode(&rsp)
            }
            method::READ_DIR_ENTRY => {
                let rsp = self.service.read_dir_entry(decode(&request)?).await?;
                encode(&rsp)
            }
            method::READ_DIR_ALL => {
                let rsp = self.service.read_dir_all(decode(&request)?).await?;
                encode(&rsp)
            }
            method::DELETE_ALL_DATA => {
                let rsp = self.service.delete_all_data(decode(&request)?).await?;
                encode(&rsp)
            }
            other => Err(Status::with_message(
                RPCCode::INVALID_METHOD_ID,
                format!("unknown meta method: {}", other),
            )),
        }
    }
}
