//! # sysmeta - System Metadata Registry
//!
//! Typed access to the traced service interactions of several target systems,
//! used to pick fault-injection targets.
//!
//! ## Features
//!
//! - **Single selector**: one current [`SystemType`] per [`SystemConfig`]
//! - **Pluggable providers**: one HTTP, RPC and DB provider per system in the [`ProviderRegistry`]
//! - **Auto-discovery**: provider crates submit a [`ProviderRegistrator`] via inventory
//! - **Dependency graph**: symmetric service adjacency derived from all records
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sysmeta::{register_snapshot, DependencyGraph, ProviderRegistry, SnapshotProvider, SystemConfig, SystemData};
//!
//! let registry = ProviderRegistry::new(Arc::new(SystemConfig::default()));
//! register_snapshot(&registry, "ts".into(), Arc::new(SnapshotProvider::from_path("ts.yaml")?));
//!
//! let data = SystemData::current(&registry)?;
//! let graph = DependencyGraph::build(&data);
//! println!("{:?}", graph.dependencies_of("ts-order-service"));
//! ```

pub use inventory;

pub mod error;
pub mod graph;
pub mod model;
pub mod provider;
pub mod registry;
pub mod snapshot;
pub mod system;
pub mod system_data;

pub use error::{MetadataError, Result};
pub use graph::DependencyGraph;
pub use model::{DatabaseOperation, InteractionRecord, RpcOperation, ServiceEndpoint};
pub use provider::{
    DataKind, DatabaseOperationProvider, Provider, RpcOperationProvider, ServiceEndpointProvider,
};
pub use registry::{ProviderRegistrator, ProviderRegistry};
pub use snapshot::{register_snapshot, SnapshotProvider, SystemSnapshot};
pub use system::{SystemConfig, SystemType};
pub use system_data::SystemData;
