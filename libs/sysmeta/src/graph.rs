//! Symmetric service-to-service dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::model::InteractionRecord;
use crate::system_data::SystemData;

/// Adjacency map built from every HTTP, RPC and DB record of a system.
///
/// Edges are stored in both directions: "A calls B" and "B is called by A"
/// are equally valid fault targets. Self-loops are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    #[instrument(name = "sysmeta.graph.build", skip(data), fields(system = %data.system()))]
    pub fn build(data: &SystemData) -> Self {
        let mut graph = Self::default();
        for service in data.get_all_services() {
            graph.add_records(&service, &data.get_http_endpoints_by_service(&service));
            graph.add_records(&service, &data.get_rpc_operations_by_service(&service));
            graph.add_records(&service, &data.get_database_operations_by_service(&service));
        }
        debug!(
            services = graph.adjacency.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    fn add_records<R: InteractionRecord>(&mut self, owner: &str, records: &[R]) {
        for record in records {
            if let Some(target) = record.remote_target(owner) {
                self.add_edge(owner, target);
            }
        }
    }

    /// Insert `source -> target` and its mirror. Empty names and self-loops are ignored.
    pub fn add_edge(&mut self, source: &str, target: &str) {
        let (source, target) = (source.trim(), target.trim());
        if source.is_empty() || target.is_empty() || source == target {
            return;
        }
        self.adjacency
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
        self.adjacency
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string());
    }

    /// Sorted neighbours of `service`; empty if it has none.
    pub fn dependencies_of(&self, service: &str) -> Vec<String> {
        self.adjacency
            .get(service)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every directed edge, sorted by (source, target). Both directions appear.
    pub fn all_service_pairs(&self) -> Vec<(String, String)> {
        self.adjacency
            .iter()
            .flat_map(|(s, targets)| targets.iter().map(move |t| (s.clone(), t.clone())))
            .collect()
    }

    /// The `index`-th dependency of `service` in sorted order.
    pub fn pair_at(&self, service: &str, index: usize) -> Option<String> {
        self.adjacency.get(service)?.iter().nth(index).cloned()
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.adjacency
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    /// Services with at least one edge, sorted.
    pub fn services(&self) -> Vec<String> {
        self.adjacency.keys().cloned().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DatabaseOperation, RpcOperation, ServiceEndpoint};
    use crate::registry::ProviderRegistry;
    use crate::snapshot::{register_snapshot, SnapshotProvider, SystemSnapshot};
    use crate::system::{SystemConfig, SystemType};
    use std::sync::Arc;

    fn data_for(snapshot: SystemSnapshot) -> SystemData {
        let reg = ProviderRegistry::new(Arc::new(SystemConfig::default()));
        register_snapshot(&reg, SystemType::new("ts"), Arc::new(SnapshotProvider::new(snapshot)));
        SystemData::current(&reg).unwrap()
    }

    #[test]
    fn http_and_db_targets_become_sorted_dependencies() {
        let graph = DependencyGraph::build(&data_for(SystemSnapshot {
            http: vec![ServiceEndpoint {
                service_name: "A".into(),
                route: "/x".into(),
                server_address: "B".into(),
                span_name: "s1".into(),
                ..Default::default()
            }],
            database: vec![DatabaseOperation {
                service_name: "A".into(),
                db_table: "orders".into(),
                server_address: "C".into(),
                span_name: "s2".into(),
                ..Default::default()
            }],
            ..Default::default()
        }));

        assert_eq!(graph.dependencies_of("A"), vec!["B", "C"]);
        assert_eq!(graph.dependencies_of("B"), vec!["A"]);
        assert_eq!(graph.pair_at("A", 1).as_deref(), Some("C"));
        assert_eq!(graph.pair_at("A", 2), None);
        assert_eq!(graph.pair_at("unknown", 0), None);
    }

    #[test]
    fn edges_are_symmetric_and_loop_free() {
        let graph = DependencyGraph::build(&data_for(SystemSnapshot {
            rpc: vec![
                RpcOperation {
                    service_name: "frontend".into(),
                    server_address: "search".into(),
                    ..Default::default()
                },
                RpcOperation {
                    service_name: "search".into(),
                    server_address: "search".into(),
                    ..Default::default()
                },
                RpcOperation {
                    service_name: "search".into(),
                    server_address: "".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }));

        let pairs = graph.all_service_pairs();
        assert_eq!(
            pairs,
            vec![
                ("frontend".to_string(), "search".to_string()),
                ("search".to_string(), "frontend".to_string()),
            ]
        );
        for (s, t) in &pairs {
            assert_ne!(s, t);
            assert!(graph.contains_edge(t, s));
        }
    }

    #[test]
    fn duplicate_records_do_not_duplicate_edges() {
        let mut graph = DependencyGraph::default();
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("a", "a");
        graph.add_edge("", "a");

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.services(), vec!["a", "b"]);
        assert_eq!(graph.len(), 2);
    }
}
