use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MetadataError, Result};
use crate::provider::{
    DataKind, DatabaseOperationProvider, Provider, RpcOperationProvider, ServiceEndpointProvider,
};
use crate::system::{SystemConfig, SystemType};

/// The function type submitted by provider crates via `inventory::submit!`.
///
/// ```rust,ignore
/// inventory::submit! {
///     sysmeta::ProviderRegistrator(|registry| {
///         sysmeta::register_snapshot(registry, SystemType::new("ts"), train_ticket_snapshot());
///     })
/// }
/// ```
pub struct ProviderRegistrator(pub fn(&ProviderRegistry));

inventory::collect!(ProviderRegistrator);

/// Providers keyed by (system, kind). At most one per key; re-registration replaces.
pub struct ProviderRegistry {
    config: Arc<SystemConfig>,
    providers: RwLock<HashMap<(SystemType, DataKind), Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .providers
            .read()
            .keys()
            .map(|(s, k)| format!("{s}/{k}"))
            .collect();
        keys.sort();
        f.debug_struct("ProviderRegistry")
            .field("current", &self.config.current_system())
            .field("providers", &keys)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new(config: Arc<SystemConfig>) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry and let every linked `ProviderRegistrator` fill it.
    pub fn discover(config: Arc<SystemConfig>) -> Self {
        let registry = Self::new(config);
        let mut count = 0usize;
        for r in ::inventory::iter::<ProviderRegistrator> {
            r.0(&registry);
            count += 1;
        }
        tracing::debug!(registrators = count, "provider discovery finished");
        registry
    }

    pub fn config(&self) -> &Arc<SystemConfig> {
        &self.config
    }

    pub fn current_system(&self) -> SystemType {
        self.config.current_system()
    }

    /// Store `provider` for `system`, returning the provider it replaced.
    ///
    /// Later lookups resolve the new provider. Views derived from the old one
    /// and cached elsewhere are not refreshed; their owners must invalidate them.
    pub fn register(&self, system: SystemType, provider: Provider) -> Option<Provider> {
        let kind = provider.kind();
        let replaced = self
            .providers
            .write()
            .insert((system.clone(), kind), provider);
        if replaced.is_some() {
            tracing::warn!(%system, %kind, "provider re-registered; previous registration replaced");
        } else {
            tracing::debug!(%system, %kind, "provider registered");
        }
        replaced
    }

    pub fn register_http(
        &self,
        system: SystemType,
        p: Arc<dyn ServiceEndpointProvider>,
    ) -> Option<Provider> {
        self.register(system, Provider::Http(p))
    }

    pub fn register_rpc(
        &self,
        system: SystemType,
        p: Arc<dyn RpcOperationProvider>,
    ) -> Option<Provider> {
        self.register(system, Provider::Rpc(p))
    }

    pub fn register_database(
        &self,
        system: SystemType,
        p: Arc<dyn DatabaseOperationProvider>,
    ) -> Option<Provider> {
        self.register(system, Provider::Database(p))
    }

    /// Provider of `kind` for the current system.
    pub fn get(&self, kind: DataKind) -> Result<Provider> {
        self.get_for(&self.current_system(), kind)
    }

    pub fn get_for(&self, system: &SystemType, kind: DataKind) -> Result<Provider> {
        self.providers
            .read()
            .get(&(system.clone(), kind))
            .cloned()
            .ok_or_else(|| MetadataError::provider_not_registered(system, kind))
    }

    pub fn has(&self, kind: DataKind) -> bool {
        self.has_for(&self.current_system(), kind)
    }

    pub fn has_for(&self, system: &SystemType, kind: DataKind) -> bool {
        self.providers.read().contains_key(&(system.clone(), kind))
    }

    pub fn http_for(&self, system: &SystemType) -> Result<Arc<dyn ServiceEndpointProvider>> {
        match self.get_for(system, DataKind::Http)? {
            Provider::Http(p) => Ok(p),
            _ => Err(MetadataError::provider_not_registered(system, DataKind::Http)),
        }
    }

    pub fn rpc_for(&self, system: &SystemType) -> Result<Arc<dyn RpcOperationProvider>> {
        match self.get_for(system, DataKind::Rpc)? {
            Provider::Rpc(p) => Ok(p),
            _ => Err(MetadataError::provider_not_registered(system, DataKind::Rpc)),
        }
    }

    pub fn database_for(&self, system: &SystemType) -> Result<Arc<dyn DatabaseOperationProvider>> {
        match self.get_for(system, DataKind::Database)? {
            Provider::Database(p) => Ok(p),
            _ => Err(MetadataError::provider_not_registered(
                system,
                DataKind::Database,
            )),
        }
    }

    /// Systems with at least one registered provider, sorted.
    pub fn systems(&self) -> Vec<SystemType> {
        let set: BTreeSet<SystemType> = self
            .providers
            .read()
            .keys()
            .map(|(s, _)| s.clone())
            .collect();
        set.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceEndpoint;

    /* --------------------------- Test helpers ------------------------- */
    struct FixedHttp(&'static str);

    impl ServiceEndpointProvider for FixedHttp {
        fn service_names(&self) -> Vec<String> {
            vec![self.0.to_string()]
        }
        fn endpoints_by_service(&self, _service: &str) -> Vec<ServiceEndpoint> {
            Vec::new()
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(SystemConfig::default()))
    }

    fn discovered_teastore(registry: &ProviderRegistry) {
        registry.register_http(SystemType::new("teastore"), Arc::new(FixedHttp("webui")));
    }

    inventory::submit! {
        ProviderRegistrator(discovered_teastore)
    }

    /* ------------------------------- Tests ---------------------------- */

    #[test]
    fn missing_provider_is_an_error_not_a_default() {
        let reg = registry();
        let err = reg.get(DataKind::Http).unwrap_err();
        match err {
            MetadataError::ProviderNotRegistered { system, kind } => {
                assert_eq!(system.as_str(), "ts");
                assert_eq!(kind, DataKind::Http);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!reg.has(DataKind::Http));
    }

    #[test]
    fn lookup_follows_the_current_system() {
        let reg = registry();
        reg.register_http(SystemType::new("ts"), Arc::new(FixedHttp("ts-order")));
        reg.register_http(SystemType::new("hs"), Arc::new(FixedHttp("frontend")));

        assert_eq!(
            reg.get(DataKind::Http).unwrap().service_names(),
            vec!["ts-order"]
        );

        reg.config().set_current_system("hs").unwrap();
        assert_eq!(
            reg.get(DataKind::Http).unwrap().service_names(),
            vec!["frontend"]
        );
        assert!(!reg.has(DataKind::Rpc));
    }

    #[test]
    fn re_registration_replaces_previous_provider() {
        let reg = registry();
        let ts = SystemType::new("ts");
        assert!(reg.register_http(ts.clone(), Arc::new(FixedHttp("first"))).is_none());
        let replaced = reg.register_http(ts.clone(), Arc::new(FixedHttp("second")));

        assert_eq!(replaced.unwrap().service_names(), vec!["first"]);
        assert_eq!(reg.http_for(&ts).unwrap().service_names(), vec!["second"]);
    }

    #[test]
    fn discover_runs_submitted_registrators() {
        let reg = ProviderRegistry::discover(Arc::new(SystemConfig::default()));
        let teastore = SystemType::new("teastore");
        assert!(reg.has_for(&teastore, DataKind::Http));
        assert!(reg.systems().contains(&teastore));
    }
}
