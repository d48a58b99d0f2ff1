//! Cluster inventory boundary and its label/container cache.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysmeta::{MetadataError, Result};
use tracing::instrument;

use crate::cache::SingleFlightCache;

/// One running container carrying an `app` label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub pod_name: String,
    pub app_label: String,
    pub container_name: String,
}

/// Read-only view of the cluster, implemented by the Kubernetes client layer.
///
/// Timeouts and cancellation are the implementor's responsibility.
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// Distinct values of label `key` on pods in `namespace`.
    async fn get_labels(&self, namespace: &str, key: &str) -> anyhow::Result<Vec<String>>;

    /// Containers of pods in `namespace` that carry an `app` label.
    async fn get_containers_with_app_label(
        &self,
        namespace: &str,
    ) -> anyhow::Result<Vec<ContainerInfo>>;
}

/// Caches inventory answers by namespace (containers) and namespace+key (labels).
pub struct InventoryCache {
    client: Arc<dyn ClusterInventory>,
    labels: SingleFlightCache<String, Vec<String>>,
    containers: SingleFlightCache<String, Vec<ContainerInfo>>,
}

impl std::fmt::Debug for InventoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryCache")
            .field("labels", &self.labels)
            .field("containers", &self.containers)
            .finish_non_exhaustive()
    }
}

fn label_key(namespace: &str, key: &str) -> String {
    format!("{namespace}/{key}")
}

impl InventoryCache {
    pub fn new(client: Arc<dyn ClusterInventory>) -> Self {
        Self {
            client,
            labels: SingleFlightCache::new("labels"),
            containers: SingleFlightCache::new("containers"),
        }
    }

    #[instrument(name = "resource_lookup.inventory.labels", skip(self))]
    pub async fn labels(&self, namespace: &str, key: &str) -> Result<Arc<Vec<String>>> {
        self.labels
            .get_or_try_build(label_key(namespace, key), || async {
                let mut values = self
                    .client
                    .get_labels(namespace, key)
                    .await
                    .map_err(|e| MetadataError::upstream("get_labels", namespace, Some(key), e))?;
                values.retain(|v| !v.trim().is_empty());
                values.sort();
                values.dedup();
                Ok::<_, MetadataError>(values)
            })
            .await
    }

    #[instrument(name = "resource_lookup.inventory.containers", skip(self))]
    pub async fn containers(&self, namespace: &str) -> Result<Arc<Vec<ContainerInfo>>> {
        self.containers
            .get_or_try_build(namespace.to_string(), || async {
                let mut containers = self
                    .client
                    .get_containers_with_app_label(namespace)
                    .await
                    .map_err(|e| {
                        MetadataError::upstream("get_containers_with_app_label", namespace, None, e)
                    })?;
                containers.sort();
                containers.dedup();
                Ok::<_, MetadataError>(containers)
            })
            .await
    }

    pub fn has_labels(&self, namespace: &str, key: &str) -> bool {
        self.labels.is_populated(&label_key(namespace, key))
    }

    pub fn has_containers(&self, namespace: &str) -> bool {
        self.containers.is_populated(&namespace.to_string())
    }

    pub fn invalidate(&self) {
        self.labels.invalidate_all();
        self.containers.invalidate_all();
    }
}
