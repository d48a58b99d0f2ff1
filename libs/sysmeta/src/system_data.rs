//! Resolved provider bundle for one system.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{DatabaseOperation, RpcOperation, ServiceEndpoint};
use crate::provider::{DatabaseOperationProvider, RpcOperationProvider, ServiceEndpointProvider};
use crate::registry::ProviderRegistry;
use crate::system::SystemType;

/// Typed accessors over the HTTP, RPC and database providers of one system.
///
/// Resolving a `SystemData` pins the system: later changes of the current
/// selection do not affect an already resolved value, so it can be handed to
/// other tasks instead of the bare identifier.
#[derive(Clone)]
pub struct SystemData {
    system: SystemType,
    http: Arc<dyn ServiceEndpointProvider>,
    rpc: Arc<dyn RpcOperationProvider>,
    database: Arc<dyn DatabaseOperationProvider>,
}

impl std::fmt::Debug for SystemData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemData")
            .field("system", &self.system)
            .finish_non_exhaustive()
    }
}

impl SystemData {
    /// Resolve the bundle for the registry's current system.
    pub fn current(registry: &ProviderRegistry) -> Result<Self> {
        Self::for_system(registry, registry.current_system())
    }

    /// Resolve the bundle for `system`; every kind must be registered.
    pub fn for_system(registry: &ProviderRegistry, system: SystemType) -> Result<Self> {
        let http = registry.http_for(&system)?;
        let rpc = registry.rpc_for(&system)?;
        let database = registry.database_for(&system)?;
        Ok(Self {
            system,
            http,
            rpc,
            database,
        })
    }

    pub fn system(&self) -> &SystemType {
        &self.system
    }

    /// Every service any provider knows about, deduplicated and sorted.
    pub fn get_all_services(&self) -> Vec<String> {
        let mut all: BTreeSet<String> = BTreeSet::new();
        all.extend(self.http.service_names());
        all.extend(self.rpc.service_names());
        all.extend(self.database.service_names());
        all.into_iter().filter(|s| !s.trim().is_empty()).collect()
    }

    pub fn get_http_endpoints_by_service(&self, service: &str) -> Vec<ServiceEndpoint> {
        self.http.endpoints_by_service(service)
    }

    pub fn get_rpc_operations_by_service(&self, service: &str) -> Vec<RpcOperation> {
        self.rpc.operations_by_service(service)
    }

    pub fn get_database_operations_by_service(&self, service: &str) -> Vec<DatabaseOperation> {
        self.database.operations_by_service(service)
    }
}
