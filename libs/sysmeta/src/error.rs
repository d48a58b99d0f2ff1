use std::path::PathBuf;

use thiserror::Error;

use crate::provider::DataKind;
use crate::system::SystemType;

/// Structured errors for the metadata registry and everything built on it.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("unknown system '{value}' (known: {})", known.join(", "))]
    Configuration { value: String, known: Vec<String> },

    #[error("no {kind} provider registered for system '{system}'")]
    ProviderNotRegistered { system: SystemType, kind: DataKind },

    #[error(
        "cluster inventory call '{operation}' failed for namespace '{namespace}'{}",
        key.as_deref().map(|k| format!(" and key '{k}'")).unwrap_or_default()
    )]
    UpstreamUnavailable {
        operation: &'static str,
        namespace: String,
        key: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("cache preload failed for {failed} of {total} tasks; first failure in '{task}'")]
    PartialPreloadFailure {
        task: String,
        failed: usize,
        total: usize,
        #[source]
        source: Box<MetadataError>,
    },

    #[error("failed to load system snapshot from '{}'", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl MetadataError {
    pub fn provider_not_registered(system: &SystemType, kind: DataKind) -> Self {
        Self::ProviderNotRegistered {
            system: system.clone(),
            kind,
        }
    }

    pub fn upstream(
        operation: &'static str,
        namespace: impl Into<String>,
        key: Option<&str>,
        source: anyhow::Error,
    ) -> Self {
        Self::UpstreamUnavailable {
            operation,
            namespace: namespace.into(),
            key: key.map(str::to_string),
            source,
        }
    }

    /// True for errors that a caller can fix by registering a provider.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::ProviderNotRegistered { .. })
    }
}

pub type Result<T, E = MetadataError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_includes_key_when_present() {
        let err = MetadataError::upstream(
            "get_labels",
            "ts",
            Some("app"),
            anyhow::anyhow!("connection refused"),
        );
        let msg = err.to_string();
        assert!(msg.contains("namespace 'ts'"), "{msg}");
        assert!(msg.contains("key 'app'"), "{msg}");

        let err = MetadataError::upstream(
            "get_containers_with_app_label",
            "ts",
            None,
            anyhow::anyhow!("timeout"),
        );
        assert!(!err.to_string().contains("key"));
    }

    #[test]
    fn configuration_message_lists_known_systems() {
        let err = MetadataError::Configuration {
            value: "nope".into(),
            known: vec!["hs".into(), "ts".into()],
        };
        assert_eq!(err.to_string(), "unknown system 'nope' (known: hs, ts)");
    }
}
