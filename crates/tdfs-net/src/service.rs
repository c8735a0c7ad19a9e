use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tdfs_types::Status;

/// Trait implemented by RPC service handlers.
///
/// Each service is identified by a numeric `service_id` and exposes methods
/// identified by `method_id`. The handler receives a raw request payload
/// and returns either a raw response payload or a `Status` error.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Unique numeric identifier for this service.
    fn service_id(&self) -> u16;

    /// Human-readable name (used for logging / diagnostics).
    fn service_name(&self) -> &str;

    /// Dispatch a method call.
    async fn handle(&self, method_id: u16, request: Bytes) -> Result<Bytes, Status>;
}

/// Registry mapping service IDs to their handlers.
pub struct ServiceRegistry {
    services: DashMap<u16, Box<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service handler. Replaces any previously registered
    /// handler with the same service ID.
    pub fn register(&self, service: Box<dyn ServiceHandler>) {
        let id = service.service_id();
        self.services.insert(id, service);
    }

    /// Look up a service by its ID.
    pub fn get(
        &self,
        service_id: u16,
    ) -> Option<dashmap::mapref::one::Ref<'_, u16, Box<dyn ServiceHandler>>> {
        self.services.get(&service_id)
    }

    /// Return the number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Return whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
