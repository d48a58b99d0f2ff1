//! Derived read-models built from one system's records.
//!
//! Every builder is a pure function of the resolved [`SystemData`]; output is
//! sorted and deduplicated so repeated builds compare equal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sysmeta::{InteractionRecord, ServiceEndpoint, SystemData};

use crate::config::LookupConfig;

/// Record kind that contributed to a call pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Http,
    Rpc,
    Db,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Http => "http",
            OperationType::Rpc => "rpc",
            OperationType::Db => "db",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed source -> target relationship observed in traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPair {
    pub source_service: String,
    pub target_service: String,
    pub span_names: BTreeSet<String>,
    pub operation_types: BTreeSet<OperationType>,
}

impl NetworkPair {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source_service: source.to_string(),
            target_service: target.to_string(),
            span_names: BTreeSet::new(),
            operation_types: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.source_service, &self.target_service)
    }
}

/// A network pair restricted to HTTP and DB contributions.
pub type DnsPair = NetworkPair;

/// One (service, database, table, operation) tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatabaseOperationEntry {
    pub service_name: String,
    pub db_name: String,
    pub table_name: String,
    pub operation: String,
}

/// Record kinds that DNS-level faults can intercept. RPC clients in the
/// reference systems resolve their transport outside the DNS path.
pub const DNS_OPERATION_TYPES: &[OperationType] = &[OperationType::Http, OperationType::Db];

pub const NETWORK_OPERATION_TYPES: &[OperationType] =
    &[OperationType::Http, OperationType::Rpc, OperationType::Db];

/// HTTP endpoints with a route, minus denied infrastructure addresses,
/// sorted by (service, route).
pub fn build_endpoints(data: &SystemData, config: &LookupConfig) -> Vec<ServiceEndpoint> {
    let mut out: Vec<ServiceEndpoint> = data
        .get_all_services()
        .iter()
        .flat_map(|service| data.get_http_endpoints_by_service(service))
        .filter(|ep| !ep.route.trim().is_empty())
        .filter(|ep| !config.is_denied(&ep.server_address))
        .collect();

    out.sort_by(|a, b| {
        (a.service_name.as_str(), a.route.as_str())
            .cmp(&(b.service_name.as_str(), b.route.as_str()))
            .then_with(|| a.cmp(b))
    });
    out.dedup();
    out
}

#[derive(Default)]
struct PairAccumulator {
    pairs: BTreeMap<(String, String), NetworkPair>,
}

impl PairAccumulator {
    fn add<R: InteractionRecord>(&mut self, owner: &str, records: &[R], op: OperationType) {
        let owner = owner.trim();
        if owner.is_empty() {
            return;
        }
        for record in records {
            let Some(target) = record.remote_target(owner) else {
                continue;
            };
            let pair = self
                .pairs
                .entry((owner.to_string(), target.to_string()))
                .or_insert_with(|| NetworkPair::new(owner, target));
            let span = record.span_name().trim();
            if !span.is_empty() {
                pair.span_names.insert(span.to_string());
            }
            pair.operation_types.insert(op);
        }
    }

    fn finish(self) -> Vec<NetworkPair> {
        self.pairs.into_values().collect()
    }
}

/// Call pairs aggregated over the record kinds in `include`, sorted by (source, target).
pub fn build_pairs(data: &SystemData, include: &[OperationType]) -> Vec<NetworkPair> {
    let mut acc = PairAccumulator::default();
    for service in data.get_all_services() {
        for op in include {
            match op {
                OperationType::Http => {
                    acc.add(&service, &data.get_http_endpoints_by_service(&service), *op)
                }
                OperationType::Rpc => {
                    acc.add(&service, &data.get_rpc_operations_by_service(&service), *op)
                }
                OperationType::Db => {
                    acc.add(&service, &data.get_database_operations_by_service(&service), *op)
                }
            }
        }
    }
    acc.finish()
}

pub fn build_network_pairs(data: &SystemData) -> Vec<NetworkPair> {
    build_pairs(data, NETWORK_OPERATION_TYPES)
}

pub fn build_dns_pairs(data: &SystemData) -> Vec<DnsPair> {
    build_pairs(data, DNS_OPERATION_TYPES)
}

/// Every DB operation as a tuple, sorted by (service, db, table, operation).
pub fn build_database_operations(data: &SystemData) -> Vec<DatabaseOperationEntry> {
    let set: BTreeSet<DatabaseOperationEntry> = data
        .get_all_services()
        .iter()
        .flat_map(|service| data.get_database_operations_by_service(service))
        .map(|op| DatabaseOperationEntry {
            service_name: op.service_name,
            db_name: op.db_name,
            table_name: op.db_table,
            operation: op.operation,
        })
        .collect();
    set.into_iter().collect()
}
