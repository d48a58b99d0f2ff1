//! File-backed providers built from an analyzer snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};
use crate::model::{DatabaseOperation, RpcOperation, ServiceEndpoint};
use crate::provider::{DatabaseOperationProvider, RpcOperationProvider, ServiceEndpointProvider};
use crate::registry::ProviderRegistry;
use crate::system::SystemType;

/// Serialized output of the offline analyzers for one system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemSnapshot {
    pub services: Vec<String>,
    pub http: Vec<ServiceEndpoint>,
    pub rpc: Vec<RpcOperation>,
    pub database: Vec<DatabaseOperation>,
}

impl SystemSnapshot {
    /// Load a snapshot from a `.yaml`/`.yml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::read(path).map_err(|source| MetadataError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).context("read snapshot file")?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => serde_json::from_str(&raw).context("parse JSON snapshot"),
            "yaml" | "yml" => serde_yaml::from_str(&raw).context("parse YAML snapshot"),
            other => anyhow::bail!("unsupported snapshot extension '{other}'"),
        }
    }
}

/// Serves all three record kinds from an in-memory snapshot, indexed by service.
#[derive(Debug, Default)]
pub struct SnapshotProvider {
    services: Vec<String>,
    http: BTreeMap<String, Vec<ServiceEndpoint>>,
    rpc: BTreeMap<String, Vec<RpcOperation>>,
    database: BTreeMap<String, Vec<DatabaseOperation>>,
}

fn index_by_service<T, F>(records: Vec<T>, owner: F) -> BTreeMap<String, Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let mut out: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for record in records {
        let service = owner(&record).trim().to_string();
        if service.is_empty() {
            continue;
        }
        out.entry(service).or_default().push(record);
    }
    out
}

impl SnapshotProvider {
    pub fn new(snapshot: SystemSnapshot) -> Self {
        let http = index_by_service(snapshot.http, |r| r.service_name.as_str());
        let rpc = index_by_service(snapshot.rpc, |r| r.service_name.as_str());
        let database = index_by_service(snapshot.database, |r| r.service_name.as_str());

        let services: BTreeSet<String> = snapshot
            .services
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .chain(http.keys().cloned())
            .chain(rpc.keys().cloned())
            .chain(database.keys().cloned())
            .collect();

        Self {
            services: services.into_iter().collect(),
            http,
            rpc,
            database,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        SystemSnapshot::from_path(path).map(Self::new)
    }
}

impl ServiceEndpointProvider for SnapshotProvider {
    fn service_names(&self) -> Vec<String> {
        self.services.clone()
    }

    fn endpoints_by_service(&self, service: &str) -> Vec<ServiceEndpoint> {
        self.http.get(service).cloned().unwrap_or_default()
    }
}

impl RpcOperationProvider for SnapshotProvider {
    fn service_names(&self) -> Vec<String> {
        self.services.clone()
    }

    fn operations_by_service(&self, service: &str) -> Vec<RpcOperation> {
        self.rpc.get(service).cloned().unwrap_or_default()
    }
}

impl DatabaseOperationProvider for SnapshotProvider {
    fn service_names(&self) -> Vec<String> {
        self.services.clone()
    }

    fn operations_by_service(&self, service: &str) -> Vec<DatabaseOperation> {
        self.database.get(service).cloned().unwrap_or_default()
    }
}

/// Register `provider` for every record kind of `system`.
pub fn register_snapshot(
    registry: &ProviderRegistry,
    system: SystemType,
    provider: Arc<SnapshotProvider>,
) {
    registry.register_http(system.clone(), provider.clone());
    registry.register_rpc(system.clone(), provider.clone());
    registry.register_database(system, provider);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn yaml_snapshot_loads_and_indexes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ts.yaml");
        fs::write(
            &path,
            r#"
services: [ts-ui-dashboard]
http:
  - service_name: ts-order-service
    request_method: POST
    route: /api/v1/orderservice/order
    server_address: ts-station-service
    span_name: POST /api/v1/stationservice/stations
database:
  - service_name: ts-order-service
    db_name: ts
    db_table: orders
    operation: SELECT
    server_address: mysql
"#,
        )
        .unwrap();

        let provider = SnapshotProvider::from_path(&path).unwrap();
        assert_eq!(
            ServiceEndpointProvider::service_names(&provider),
            vec!["ts-order-service", "ts-ui-dashboard"]
        );
        assert_eq!(provider.endpoints_by_service("ts-order-service").len(), 1);
        assert_eq!(
            DatabaseOperationProvider::operations_by_service(&provider, "ts-order-service")[0]
                .db_table,
            "orders"
        );
        assert!(RpcOperationProvider::operations_by_service(&provider, "ts-order-service").is_empty());
    }

    #[test]
    fn json_snapshot_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hs.json");
        fs::write(
            &path,
            r#"{"rpc":[{"service_name":"frontend","rpc_service":"search.Search","server_address":"search"}]}"#,
        )
        .unwrap();

        let snapshot = SystemSnapshot::from_path(&path).unwrap();
        assert_eq!(snapshot.rpc.len(), 1);
        assert_eq!(snapshot.rpc[0].server_address, "search");
    }

    #[test]
    fn unknown_extension_and_bad_content_are_snapshot_errors() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("ts.txt");
        fs::write(&txt, "services: []").unwrap();
        assert!(matches!(
            SystemSnapshot::from_path(&txt),
            Err(MetadataError::Snapshot { .. })
        ));

        let bad = dir.path().join("ts.yaml");
        fs::write(&bad, "unexpected_section: 1").unwrap();
        let err = SystemSnapshot::from_path(&bad).unwrap_err();
        assert!(err.to_string().contains("ts.yaml"));
    }

    #[test]
    fn records_without_owner_are_dropped() {
        let provider = SnapshotProvider::new(SystemSnapshot {
            http: vec![ServiceEndpoint {
                route: "/orphan".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert!(ServiceEndpointProvider::service_names(&provider).is_empty());
    }
}
