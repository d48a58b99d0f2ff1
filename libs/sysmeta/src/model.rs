//! Raw interaction records produced by the offline trace analyzers.

use serde::{Deserialize, Serialize};

/// One observed HTTP call made by `service_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoint {
    pub service_name: String,
    pub request_method: String,
    pub route: String,
    pub response_status: String,
    pub server_address: String,
    pub server_port: String,
    pub span_name: String,
}

/// One observed RPC call (gRPC, Thrift, ...) made by `service_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcOperation {
    pub service_name: String,
    pub rpc_system: String,
    pub rpc_service: String,
    pub rpc_method: String,
    pub status_code: String,
    pub server_address: String,
    pub server_port: String,
    pub span_name: String,
    pub span_kind: String,
}

/// One observed database operation issued by `service_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOperation {
    pub service_name: String,
    pub db_name: String,
    pub db_table: String,
    pub operation: String,
    pub db_system: String,
    pub server_address: String,
    pub server_port: String,
    pub span_name: String,
}

/// Common view over the three record kinds used by graph and pair builders.
pub trait InteractionRecord {
    fn service_name(&self) -> &str;
    fn server_address(&self) -> &str;
    fn span_name(&self) -> &str;

    /// The callee, when the record points at a service other than its owner.
    fn remote_target(&self, owner: &str) -> Option<&str> {
        let target = self.server_address().trim();
        (!target.is_empty() && target != owner.trim()).then_some(target)
    }
}

macro_rules! impl_interaction_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl InteractionRecord for $ty {
                fn service_name(&self) -> &str {
                    &self.service_name
                }
                fn server_address(&self) -> &str {
                    &self.server_address
                }
                fn span_name(&self) -> &str {
                    &self.span_name
                }
            }
        )+
    };
}

impl_interaction_record!(ServiceEndpoint, RpcOperation, DatabaseOperation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_target_skips_empty_and_self() {
        let mut ep = ServiceEndpoint {
            service_name: "a".into(),
            server_address: "".into(),
            ..Default::default()
        };
        assert_eq!(ep.remote_target("a"), None);

        ep.server_address = "a".into();
        assert_eq!(ep.remote_target("a"), None);

        ep.server_address = " b ".into();
        assert_eq!(ep.remote_target("a"), Some("b"));
    }

    #[test]
    fn remote_target_ignores_padding_on_owner() {
        let ep = ServiceEndpoint {
            service_name: " a".into(),
            server_address: "a".into(),
            ..Default::default()
        };
        assert_eq!(ep.remote_target(" a"), None);
        assert_eq!(ep.remote_target("b "), Some("a"));
    }

    #[test]
    fn records_deserialize_with_missing_fields() {
        let op: DatabaseOperation =
            serde_json::from_str(r#"{"service_name":"a","db_table":"orders"}"#).unwrap();
        assert_eq!(op.db_table, "orders");
        assert!(op.server_address.is_empty());
    }
}
