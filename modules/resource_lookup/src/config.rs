use serde::{Deserialize, Serialize};

/// Configuration for the resource_lookup module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// Server addresses that are never offered as HTTP fault targets
    /// (message brokers and other shared infrastructure). Matched as substrings.
    #[serde(default = "default_denied_addresses")]
    pub denied_addresses: Vec<String>,
    /// Namespace passed to the cluster inventory on preload.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Label key whose values are listed on preload.
    #[serde(default = "default_label_key")]
    pub label_key: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            denied_addresses: default_denied_addresses(),
            namespace: default_namespace(),
            label_key: default_label_key(),
        }
    }
}

impl LookupConfig {
    /// Parse the module section of the application config; `None` yields defaults.
    pub fn from_value(value: Option<&serde_json::Value>) -> anyhow::Result<Self> {
        match value {
            Some(v) => Ok(serde_json::from_value(v.clone())?),
            None => Ok(Self::default()),
        }
    }

    pub fn is_denied(&self, server_address: &str) -> bool {
        let addr = server_address.trim();
        self.denied_addresses
            .iter()
            .map(|d| d.trim())
            .any(|d| !d.is_empty() && addr.contains(d))
    }
}

fn default_denied_addresses() -> Vec<String> {
    vec!["rabbitmq".to_string()]
}

fn default_namespace() -> String {
    "ts".to_string()
}

fn default_label_key() -> String {
    "app".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_section_uses_defaults() {
        let cfg = LookupConfig::from_value(None).unwrap();
        assert_eq!(cfg, LookupConfig::default());
        assert!(cfg.is_denied("ts-rabbitmq"));
        assert!(!cfg.is_denied("ts-order-service"));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let value = serde_json::json!({ "denied_addresses": ["kafka", ""] });
        let cfg = LookupConfig::from_value(Some(&value)).unwrap();
        assert_eq!(cfg.namespace, "ts");
        assert!(cfg.is_denied("kafka.default.svc"));
        assert!(!cfg.is_denied("rabbitmq"));
        assert!(!cfg.is_denied("anything"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let value = serde_json::json!({ "ttl_secs": 10 });
        assert!(LookupConfig::from_value(Some(&value)).is_err());
    }
}
