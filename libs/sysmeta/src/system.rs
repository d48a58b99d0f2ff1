//! Target system identifiers and the selector for the "current" system.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};

/// Opaque identifier of one target system (e.g. `ts` for Train-Ticket).
///
/// Cheap to clone; used as a cache and registry key everywhere.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemType(Arc<str>);

impl SystemType {
    pub const TRAIN_TICKET: &'static str = "ts";
    pub const OTEL_DEMO: &'static str = "otel-demo";
    pub const MEDIA_MICROSERVICES: &'static str = "media";
    pub const HOTEL_RESERVATION: &'static str = "hs";
    pub const SOCIAL_NETWORK: &'static str = "sn";
    pub const ONLINE_BOUTIQUE: &'static str = "ob";
    pub const SOCK_SHOP: &'static str = "sockshop";
    pub const TEA_STORE: &'static str = "teastore";

    /// Identifiers accepted by [`SystemConfig::default`].
    pub const BUILTIN: &'static [&'static str] = &[
        Self::TRAIN_TICKET,
        Self::OTEL_DEMO,
        Self::MEDIA_MICROSERVICES,
        Self::HOTEL_RESERVATION,
        Self::SOCIAL_NETWORK,
        Self::ONLINE_BOUTIQUE,
        Self::SOCK_SHOP,
        Self::TEA_STORE,
    ];

    /// Wrap an identifier without validating it against any known set.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref().trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SystemType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Process-wide selector of the current target system.
///
/// Holds the closed set of accepted identifiers and exactly one current
/// selection. Share it behind an `Arc`; reads take a shared lock and never
/// hold it past the clone of the identifier.
pub struct SystemConfig {
    known: BTreeSet<SystemType>,
    current: RwLock<SystemType>,
}

impl fmt::Debug for SystemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemConfig")
            .field("current", &*self.current.read())
            .field("known", &self.known.len())
            .finish()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let known: BTreeSet<SystemType> = SystemType::BUILTIN
            .iter()
            .copied()
            .map(SystemType::new)
            .collect();
        Self {
            known,
            current: RwLock::new(SystemType::new(SystemType::TRAIN_TICKET)),
        }
    }
}

impl SystemConfig {
    /// Build a selector over `known` and select `initial`.
    pub fn new<I, S>(known: I, initial: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known: BTreeSet<SystemType> = known
            .into_iter()
            .map(|s| SystemType::new(s))
            .filter(|s| !s.as_str().is_empty())
            .collect();
        let initial = validate(&known, initial)?;
        Ok(Self {
            known,
            current: RwLock::new(initial),
        })
    }

    /// Built-in systems plus `extra` identifiers, with `initial` selected.
    pub fn with_extra_systems<I, S>(extra: I, initial: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = extra.into_iter().map(|s| s.as_ref().to_string()).collect();
        let all = SystemType::BUILTIN
            .iter()
            .map(|s| s.to_string())
            .chain(extra);
        Self::new(all, initial)
    }

    /// Validate an identifier against the known set.
    pub fn parse(&self, id: &str) -> Result<SystemType> {
        validate(&self.known, id)
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(&SystemType::new(id))
    }

    /// Replace the current selection. Unknown identifiers leave it untouched.
    pub fn set_current_system(&self, id: &str) -> Result<SystemType> {
        let system = self.parse(id)?;
        let previous = std::mem::replace(&mut *self.current.write(), system.clone());
        if previous != system {
            tracing::info!(%previous, current = %system, "current system changed");
        }
        Ok(system)
    }

    pub fn current_system(&self) -> SystemType {
        self.current.read().clone()
    }

    pub fn known_systems(&self) -> Vec<SystemType> {
        self.known.iter().cloned().collect()
    }
}

fn validate(known: &BTreeSet<SystemType>, id: &str) -> Result<SystemType> {
    let candidate = SystemType::new(id);
    if known.contains(&candidate) {
        Ok(candidate)
    } else {
        Err(MetadataError::Configuration {
            value: id.to_string(),
            known: known.iter().map(|s| s.to_string()).collect(),
        })
    }
}
