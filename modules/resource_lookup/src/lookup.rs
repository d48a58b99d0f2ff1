use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sysmeta::{
    DependencyGraph, MetadataError, ProviderRegistry, Result, ServiceEndpoint, SystemData,
    SystemType,
};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::cache::SingleFlightCache;
use crate::config::LookupConfig;
use crate::inventory::{ClusterInventory, ContainerInfo, InventoryCache};
use crate::views::{self, DatabaseOperationEntry, DnsPair, NetworkPair};

/// Unit of work run concurrently by [`ResourceLookup::preload_caches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreloadTask {
    Endpoints,
    NetworkPairs,
    DnsPairs,
    DatabaseOperations,
    Inventory,
}

impl PreloadTask {
    pub const ALL: [PreloadTask; 5] = [
        PreloadTask::Endpoints,
        PreloadTask::NetworkPairs,
        PreloadTask::DnsPairs,
        PreloadTask::DatabaseOperations,
        PreloadTask::Inventory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreloadTask::Endpoints => "endpoints",
            PreloadTask::NetworkPairs => "network_pairs",
            PreloadTask::DnsPairs => "dns_pairs",
            PreloadTask::DatabaseOperations => "database_operations",
            PreloadTask::Inventory => "inventory",
        }
    }
}

impl fmt::Display for PreloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which per-system slots currently hold a built value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub system: SystemType,
    pub endpoints: bool,
    pub network_pairs: bool,
    pub dns_pairs: bool,
    pub database_operations: bool,
    pub dependency_graph: bool,
}

impl CacheStatus {
    pub fn warm_count(&self) -> usize {
        [
            self.endpoints,
            self.network_pairs,
            self.dns_pairs,
            self.database_operations,
            self.dependency_graph,
        ]
        .iter()
        .filter(|warm| **warm)
        .count()
    }
}

/// Cached, per-system read-models over the provider registry.
///
/// Every view is built on first access for a system and kept until
/// [`invalidate_cache`](Self::invalidate_cache). Returned values are shared;
/// callers get an `Arc` and cannot mutate the cached data.
///
/// Views do not observe the registry. After replacing a provider with
/// [`ProviderRegistry::register`], call `invalidate_cache` before reading
/// views that were already built, or they keep serving the old provider's data.
pub struct ResourceLookup {
    registry: Arc<ProviderRegistry>,
    config: LookupConfig,
    endpoints: SingleFlightCache<SystemType, Vec<ServiceEndpoint>>,
    network_pairs: SingleFlightCache<SystemType, Vec<NetworkPair>>,
    dns_pairs: SingleFlightCache<SystemType, Vec<DnsPair>>,
    database_operations: SingleFlightCache<SystemType, Vec<DatabaseOperationEntry>>,
    graphs: SingleFlightCache<SystemType, DependencyGraph>,
    inventory: InventoryCache,
}

impl fmt::Debug for ResourceLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLookup")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("endpoints", &self.endpoints)
            .field("network_pairs", &self.network_pairs)
            .field("dns_pairs", &self.dns_pairs)
            .field("database_operations", &self.database_operations)
            .field("graphs", &self.graphs)
            .field("inventory", &self.inventory)
            .finish()
    }
}

impl ResourceLookup {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        inventory: Arc<dyn ClusterInventory>,
        config: LookupConfig,
    ) -> Self {
        Self {
            registry,
            config,
            endpoints: SingleFlightCache::new("endpoints"),
            network_pairs: SingleFlightCache::new("network_pairs"),
            dns_pairs: SingleFlightCache::new("dns_pairs"),
            database_operations: SingleFlightCache::new("database_operations"),
            graphs: SingleFlightCache::new("dependency_graph"),
            inventory: InventoryCache::new(inventory),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn inventory(&self) -> &InventoryCache {
        &self.inventory
    }

    pub fn current_system(&self) -> SystemType {
        self.registry.current_system()
    }

    fn system_data(&self, system: &SystemType) -> Result<SystemData> {
        SystemData::for_system(&self.registry, system.clone())
    }

    /// All services of the current system. Not cached; providers are immutable.
    pub fn get_all_services(&self) -> Result<Vec<String>> {
        Ok(self.system_data(&self.current_system())?.get_all_services())
    }

    pub async fn get_http_endpoints(&self) -> Result<Arc<Vec<ServiceEndpoint>>> {
        self.get_http_endpoints_for(&self.current_system()).await
    }

    #[instrument(name = "resource_lookup.endpoints", skip(self, system), fields(%system))]
    pub async fn get_http_endpoints_for(
        &self,
        system: &SystemType,
    ) -> Result<Arc<Vec<ServiceEndpoint>>> {
        self.endpoints
            .get_or_try_build(system.clone(), || async {
                let data = self.system_data(system)?;
                let out = views::build_endpoints(&data, &self.config);
                debug!(count = out.len(), "endpoint view built");
                Ok::<_, MetadataError>(out)
            })
            .await
    }

    pub async fn get_network_pairs(&self) -> Result<Arc<Vec<NetworkPair>>> {
        self.get_network_pairs_for(&self.current_system()).await
    }

    #[instrument(name = "resource_lookup.network_pairs", skip(self, system), fields(%system))]
    pub async fn get_network_pairs_for(
        &self,
        system: &SystemType,
    ) -> Result<Arc<Vec<NetworkPair>>> {
        self.network_pairs
            .get_or_try_build(system.clone(), || async {
                let data = self.system_data(system)?;
                let out = views::build_network_pairs(&data);
                debug!(count = out.len(), "network pair view built");
                Ok::<_, MetadataError>(out)
            })
            .await
    }

    pub async fn get_dns_pairs(&self) -> Result<Arc<Vec<DnsPair>>> {
        self.get_dns_pairs_for(&self.current_system()).await
    }

    #[instrument(name = "resource_lookup.dns_pairs", skip(self, system), fields(%system))]
    pub async fn get_dns_pairs_for(&self, system: &SystemType) -> Result<Arc<Vec<DnsPair>>> {
        self.dns_pairs
            .get_or_try_build(system.clone(), || async {
                let data = self.system_data(system)?;
                let out = views::build_dns_pairs(&data);
                debug!(count = out.len(), "dns pair view built");
                Ok::<_, MetadataError>(out)
            })
            .await
    }

    pub async fn get_database_operations(&self) -> Result<Arc<Vec<DatabaseOperationEntry>>> {
        self.get_database_operations_for(&self.current_system())
            .await
    }

    #[instrument(name = "resource_lookup.database_operations", skip(self, system), fields(%system))]
    pub async fn get_database_operations_for(
        &self,
        system: &SystemType,
    ) -> Result<Arc<Vec<DatabaseOperationEntry>>> {
        self.database_operations
            .get_or_try_build(system.clone(), || async {
                let data = self.system_data(system)?;
                let out = views::build_database_operations(&data);
                debug!(count = out.len(), "database operation view built");
                Ok::<_, MetadataError>(out)
            })
            .await
    }

    pub async fn dependency_graph(&self) -> Result<Arc<DependencyGraph>> {
        self.dependency_graph_for(&self.current_system()).await
    }

    pub async fn dependency_graph_for(&self, system: &SystemType) -> Result<Arc<DependencyGraph>> {
        self.graphs
            .get_or_try_build(system.clone(), || async {
                let data = self.system_data(system)?;
                Ok::<_, MetadataError>(DependencyGraph::build(&data))
            })
            .await
    }

    /// Sorted dependencies of `service` in the current system's graph.
    pub async fn dependencies_of(&self, service: &str) -> Result<Vec<String>> {
        Ok(self.dependency_graph().await?.dependencies_of(service))
    }

    pub async fn get_labels(&self, namespace: &str, key: &str) -> Result<Arc<Vec<String>>> {
        self.inventory.labels(namespace, key).await
    }

    pub async fn get_containers_with_app_label(
        &self,
        namespace: &str,
    ) -> Result<Arc<Vec<ContainerInfo>>> {
        self.inventory.containers(namespace).await
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache_status_for(&self.current_system())
    }

    pub fn cache_status_for(&self, system: &SystemType) -> CacheStatus {
        CacheStatus {
            system: system.clone(),
            endpoints: self.endpoints.is_populated(system),
            network_pairs: self.network_pairs.is_populated(system),
            dns_pairs: self.dns_pairs.is_populated(system),
            database_operations: self.database_operations.is_populated(system),
            dependency_graph: self.graphs.is_populated(system),
        }
    }

    async fn run_preload_task(
        &self,
        task: PreloadTask,
        system: &SystemType,
        namespace: &str,
        label_key: &str,
    ) -> Result<()> {
        match task {
            PreloadTask::Endpoints => self.get_http_endpoints_for(system).await.map(drop),
            PreloadTask::NetworkPairs => self.get_network_pairs_for(system).await.map(drop),
            PreloadTask::DnsPairs => self.get_dns_pairs_for(system).await.map(drop),
            PreloadTask::DatabaseOperations => {
                self.get_database_operations_for(system).await.map(drop)
            }
            PreloadTask::Inventory => {
                // Both fetches run to completion before either error is reported.
                let (labels, containers) = tokio::join!(
                    self.inventory.labels(namespace, label_key),
                    self.inventory.containers(namespace),
                );
                labels.and(containers).map(drop)
            }
        }
    }

    /// Warm every view of the current system and the inventory cache.
    ///
    /// Runs one task per [`PreloadTask`] and waits for all of them. A failing
    /// task never cancels its siblings; their slots stay populated. When any
    /// task fails the error wraps the first failure in `PreloadTask::ALL`
    /// order.
    #[instrument(name = "resource_lookup.preload", skip(self))]
    pub async fn preload_caches(self: &Arc<Self>, namespace: &str, label_key: &str) -> Result<()> {
        let system = self.current_system();
        let started = Instant::now();
        info!(%system, "preloading caches");

        let mut set = JoinSet::new();
        for task in PreloadTask::ALL {
            let this = Arc::clone(self);
            let system = system.clone();
            let namespace = namespace.to_string();
            let label_key = label_key.to_string();
            set.spawn(async move {
                let res = this
                    .run_preload_task(task, &system, &namespace, &label_key)
                    .await;
                (task, res)
            });
        }

        let mut failures: Vec<(PreloadTask, MetadataError)> = Vec::new();
        let mut panic = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((task, Err(e))) => {
                    warn!(%system, %task, error = %e, "cache preload task failed");
                    failures.push((task, e));
                }
                Err(e) if e.is_panic() => panic = Some(e.into_panic()),
                Err(e) => warn!(%system, error = %e, "cache preload task cancelled"),
            }
        }
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if failures.is_empty() {
            info!(%system, elapsed_ms, "caches preloaded");
            return Ok(());
        }

        failures.sort_by_key(|(task, _)| *task);
        let failed = failures.len();
        let (task, source) = failures.swap_remove(0);
        warn!(%system, failed, elapsed_ms, "cache preload finished with failures");
        Err(MetadataError::PartialPreloadFailure {
            task: task.to_string(),
            failed,
            total: PreloadTask::ALL.len(),
            source: Box::new(source),
        })
    }

    /// Drop every cached view and inventory answer, for all systems.
    pub fn invalidate_cache(&self) {
        self.endpoints.invalidate_all();
        self.network_pairs.invalidate_all();
        self.dns_pairs.invalidate_all();
        self.database_operations.invalidate_all();
        self.graphs.invalidate_all();
        self.inventory.invalidate();
        info!("resource lookup caches invalidated");
    }
}
