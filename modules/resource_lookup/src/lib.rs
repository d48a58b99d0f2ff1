//! Resource Lookup Module
//!
//! Cached read-models used to pick fault-injection targets for the current
//! system:
//! - HTTP endpoint list (infrastructure addresses removed)
//! - network call pairs (HTTP + RPC + DB)
//! - DNS pairs (HTTP + DB only)
//! - database operation list
//! - service dependency graph
//!
//! plus a label/container cache over the cluster inventory. All slots share
//! one invalidation switch and can be warmed concurrently with
//! [`ResourceLookup::preload_caches`].

pub mod cache;
pub mod config;
pub mod inventory;
pub mod lookup;
pub mod views;

pub use cache::SingleFlightCache;
pub use config::LookupConfig;
pub use inventory::{ClusterInventory, ContainerInfo, InventoryCache};
pub use lookup::{CacheStatus, PreloadTask, ResourceLookup};
pub use views::{DatabaseOperationEntry, DnsPair, NetworkPair, OperationType};
