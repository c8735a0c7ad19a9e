use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::error::NetError;
use crate::service::ServiceRegistry;
use crate::socket::{Listener, Socket};
use crate::transport::{recv_message, send_message};
use tdfs_proto::envelope;
use tdfs_types::status_code::RPCCode;
use tdfs_types::Status;

/// Size of the request envelope preceding the message body.
///
/// After the `MessageHeader` + payload are read, the first 4 bytes of the
/// payload encode `service_id: u16 LE` and `method_id: u16 LE`, followed by
/// the actual request body.
pub const REQUEST_ENVELOPE_SIZE: usize = 4;

/// RPC server that hosts registered services.
///
/// The server accepts connections from a `Listener`, reads framed RPC
/// messages, dispatches them to the appropriate `ServiceHandler`, and
/// writes back the `[status][body]` reply. Each inbound connection gets its
/// own task; shutdown is coordinated through `stop()`.
pub struct Server {
    services: Arc<ServiceRegistry>,
    /// Signalled when `stop()` is called to cancel the accept loop.
    shutdown: Arc<Notify>,
    /// Whether the server has been started.
    running: bool,
}

impl Server {
    pub fn new() -> Self {
        Self {
            services: Arc::new(ServiceRegistry::new()),
            shutdown: Arc::new(Notify::new()),
            running: false,
        }
    }

    /// Create a server with the given pre-populated registry.
    pub fn with_registry(registry: ServiceRegistry) -> Self {
        Self {
            services: Arc::new(registry),
            shutdown: Arc::new(Notify::new()),
            running: false,
        }
    }

    /// Register a service handler with this server.
    pub fn register_service(&self, service: Box<dyn crate::service::ServiceHandler>) {
        self.services.register(service);
    }

    /// Return a reference to the service registry.
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Start accepting connections from the provided `Listener`.
    ///
    /// This spawns a background task that runs until `stop()` is called.
    pub fn start<L: Listener + 'static>(&mut self, listener: L) {
        if self.running {
            tracing::warn!("server already running, ignoring duplicate start");
            return;
        }
        self.running = true;

        let services = Arc::clone(&self.services);
        let shutdown = Arc::clone(&self.shutdown);
        let addr = listener.local_addr();

        tracing::info!(%addr, "server starting");

        tokio::spawn(async move {
            Self::accept_loop(listener, services, shutdown).await;
            tracing::info!(%addr, "server accept loop exited");
        });
    }

    /// Stop the server, signaling the accept loop and all active
    /// connections.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("server stopping");
            self.shutdown.notify_waiters();
            self.running = false;
        }
    }

    /// Return whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    // -----------------------------------------------------------------------
    // Internal implementation
    // -----------------------------------------------------------------------

    async fn accept_loop<L: Listener>(
        listener: L,
        services: Arc<ServiceRegistry>,
        shutdown: Arc<Notify>,
    ) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => {
                    tracing::info!("server shutdown signal received");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok(socket) => {
                            let services = Arc::clone(&services);
                            let shutdown = Arc::clone(&shutdown);
                            tasks.spawn(async move {
                                if let Err(e) = Self::handle_connection(&socket, services, shutdown).await {
                                    tracing::debug!("connection handler finished: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                            // Brief pause to avoid tight error loops.
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }
            }
        }

        // Wait for all active connection tasks to finish.
        tasks.shutdown().await;
    }

    async fn handle_connection<S: Socket>(
        socket: &S,
        services: Arc<ServiceRegistry>,
        shutdown: Arc<Notify>,
    ) -> Result<(), NetError> {
        let peer = socket.peer_addr();
        tracing::debug!(%peer, "new connection");

        loop {
            // Check for shutdown between requests.
            let payload = tokio::select! {
                biased;

                _ = shutdown.notified() => {
                    tracing::debug!(%peer, "connection shutdown");
                    return Err(NetError::ShuttingDown);
                }

                result = recv_message(socket) => {
                    result?
                }
            };

            // Decode the request envelope.
            if payload.len() < REQUEST_ENVELOPE_SIZE {
                tracing::warn!(%peer, "request too small: {} bytes", payload.len());
                continue;
            }

            let service_id = u16::from_le_bytes([payload[0], payload[1]]);
            let method_id = u16::from_le_bytes([payload[2], payload[3]]);
            let body = payload.slice(REQUEST_ENVELOPE_SIZE..);

            tracing::debug!(
                %peer,
                service_id,
                method_id,
                body_len = body.len(),
                "dispatching request"
            );

            // Look up the service and dispatch; both handler errors and an
            // unknown service id travel back inside the reply envelope.
            let result = match services.get(service_id) {
                Some(handler) => handler
                    .handle(method_id, body)
                    .await
                    .map(|rsp: Bytes| rsp.to_vec()),
                None => {
                    tracing::warn!(%peer, service_id, "service not found");
                    Err(Status::with_message(
                        RPCCode::INVALID_SERVICE_ID,
                        format!("no service with id {}", service_id),
                    ))
                }
            };

            if let Err(status) = &result {
                tracing::debug!(%peer, service_id, method_id, %status, "handler returned error");
            }

            let reply = envelope::encode_reply(result);
            send_message(socket, &reply).await?;
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}
