//! Read-only provider contracts, one per record kind.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{DatabaseOperation, RpcOperation, ServiceEndpoint};

/// Record kind a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Http,
    Rpc,
    Database,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Http, DataKind::Rpc, DataKind::Database];

    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Http => "http",
            DataKind::Rpc => "rpc",
            DataKind::Database => "database",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP endpoints observed per service.
pub trait ServiceEndpointProvider: Send + Sync {
    fn service_names(&self) -> Vec<String>;
    fn endpoints_by_service(&self, service: &str) -> Vec<ServiceEndpoint>;
}

/// RPC operations observed per service.
pub trait RpcOperationProvider: Send + Sync {
    fn service_names(&self) -> Vec<String>;
    fn operations_by_service(&self, service: &str) -> Vec<RpcOperation>;
}

/// Database operations observed per service.
pub trait DatabaseOperationProvider: Send + Sync {
    fn service_names(&self) -> Vec<String>;
    fn operations_by_service(&self, service: &str) -> Vec<DatabaseOperation>;
}

/// A registered provider of any kind.
#[derive(Clone)]
pub enum Provider {
    Http(Arc<dyn ServiceEndpointProvider>),
    Rpc(Arc<dyn RpcOperationProvider>),
    Database(Arc<dyn DatabaseOperationProvider>),
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.kind()).finish()
    }
}

impl Provider {
    pub fn http(p: Arc<dyn ServiceEndpointProvider>) -> Self {
        Self::Http(p)
    }

    pub fn rpc(p: Arc<dyn RpcOperationProvider>) -> Self {
        Self::Rpc(p)
    }

    pub fn database(p: Arc<dyn DatabaseOperationProvider>) -> Self {
        Self::Database(p)
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Provider::Http(_) => DataKind::Http,
            Provider::Rpc(_) => DataKind::Rpc,
            Provider::Database(_) => DataKind::Database,
        }
    }

    pub fn service_names(&self) -> Vec<String> {
        match self {
            Provider::Http(p) => p.service_names(),
            Provider::Rpc(p) => p.service_names(),
            Provider::Database(p) => p.service_names(),
        }
    }

    pub fn as_http(&self) -> Option<&Arc<dyn ServiceEndpointProvider>> {
        match self {
            Provider::Http(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_rpc(&self) -> Option<&Arc<dyn RpcOperationProvider>> {
        match self {
            Provider::Rpc(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&Arc<dyn DatabaseOperationProvider>> {
        match self {
            Provider::Database(p) => Some(p),
            _ => None,
        }
    }
}
