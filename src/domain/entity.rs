//! Entity kinds and the tagged union of entity payloads
//!
//! Every change record carries one of the [`Entity`] variants. [`Table`] is the
//! closed set of entity kinds known to the store, plus [`Table::Unknown`] for names
//! that arrive from the store boundary without a matching kind.

use super::cluster::{
    CircuitBreaker, Cluster, ClusterNodeGroup, Endpoint, HealthCheck, TcpKeepalive, Threshold,
    TlsConfig, TlsConfigNodeGroup,
};
use super::listener::{ExtAuthzFilter, Listener, ListenerWasmFilter, WasmFilter};
use super::node_group::{DeploymentVersion, EnvoyConfigVersion, MicroserviceVersion, NodeGroup};
use super::route::{
    HashPolicy, HeaderMatcher, RateLimit, RetryPolicy, Route, RouteConfiguration,
    StatefulSession, VirtualHost, VirtualHostDomain,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Composite resource kinds: the units versioned per node group and delivered to proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Cluster,
    RouteConfiguration,
    Listener,
    Runtime,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Cluster,
        ResourceKind::RouteConfiguration,
        ResourceKind::Listener,
        ResourceKind::Runtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "Cluster",
            ResourceKind::RouteConfiguration => "RouteConfiguration",
            ResourceKind::Listener => "Listener",
            ResourceKind::Runtime => "Runtime",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = crate::errors::DeltaplaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                crate::errors::DeltaplaneError::validation_field(
                    format!("Unknown resource kind '{}'", s),
                    "resource_kind",
                )
            })
    }
}

/// Implemented by every entity payload type.
pub trait TableEntity: Sized {
    /// Table the entity is stored in
    fn table() -> Table;

    /// Borrow the payload out of an [`Entity`] of the matching variant
    fn from_entity(entity: &Entity) -> Option<&Self>;

    /// Store key, unique within the table
    fn primary_key(&self) -> String;
}

macro_rules! entity_kinds {
    ($($variant:ident($ty:ty) => $name:literal, |$e:ident| $key:expr;)*) => {
        /// Entity kind (store table) identifier
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum Table {
            $($variant,)*
            /// A table name with no matching entity kind
            Unknown(String),
        }

        impl Table {
            /// Every known table
            pub const KNOWN: &'static [Table] = &[$(Table::$variant,)*];

            pub fn as_str(&self) -> &str {
                match self {
                    $(Table::$variant => $name,)*
                    Table::Unknown(name) => name.as_str(),
                }
            }
        }

        impl From<&str> for Table {
            fn from(name: &str) -> Self {
                match name {
                    $($name => Table::$variant,)*
                    other => Table::Unknown(other.to_string()),
                }
            }
        }

        /// Tagged union of every entity payload
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Entity {
            $($variant($ty),)*
        }

        impl Entity {
            /// Table the payload belongs to
            pub fn table(&self) -> Table {
                match self {
                    $(Entity::$variant(_) => Table::$variant,)*
                }
            }

            /// Store key of the payload, unique within its table
            pub fn primary_key(&self) -> String {
                match self {
                    $(Entity::$variant(inner) => inner.primary_key(),)*
                }
            }
        }

        $(
            impl TableEntity for $ty {
                fn table() -> Table {
                    Table::$variant
                }

                fn from_entity(entity: &Entity) -> Option<&Self> {
                    match entity {
                        Entity::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn primary_key(&self) -> String {
                    let $e = self;
                    $key
                }
            }

            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

entity_kinds! {
    NodeGroup(NodeGroup) => "node_groups", |e| e.name.clone();
    DeploymentVersion(DeploymentVersion) => "deployment_versions", |e| e.version.clone();
    MicroserviceVersion(MicroserviceVersion) => "microservice_versions",
        |e| format!("{}/{}/{}", e.name, e.namespace, e.deployment_version);
    EnvoyConfigVersion(EnvoyConfigVersion) => "envoy_config_versions",
        |e| format!("{}/{}", e.node_group, e.entity_type);
    Cluster(Cluster) => "clusters", |e| e.id.to_string();
    ClusterNodeGroup(ClusterNodeGroup) => "clusters_node_groups",
        |e| format!("{}/{}", e.cluster_id, e.node_group);
    Endpoint(Endpoint) => "endpoints", |e| e.id.to_string();
    HealthCheck(HealthCheck) => "health_checks", |e| e.id.to_string();
    CircuitBreaker(CircuitBreaker) => "circuit_breakers", |e| e.id.to_string();
    Threshold(Threshold) => "thresholds", |e| e.id.to_string();
    TcpKeepalive(TcpKeepalive) => "tcp_keepalives", |e| e.id.to_string();
    TlsConfig(TlsConfig) => "tls_configs", |e| e.id.to_string();
    TlsConfigNodeGroup(TlsConfigNodeGroup) => "tls_configs_node_groups",
        |e| format!("{}/{}", e.tls_config_id, e.node_group);
    RouteConfiguration(RouteConfiguration) => "route_configurations", |e| e.id.to_string();
    VirtualHost(VirtualHost) => "virtual_hosts", |e| e.id.to_string();
    VirtualHostDomain(VirtualHostDomain) => "virtual_host_domains",
        |e| format!("{}/{}", e.virtual_host_id, e.domain);
    Route(Route) => "routes", |e| e.id.to_string();
    HeaderMatcher(HeaderMatcher) => "header_matchers", |e| e.id.to_string();
    RetryPolicy(RetryPolicy) => "retry_policies", |e| e.id.to_string();
    HashPolicy(HashPolicy) => "hash_policies", |e| e.id.to_string();
    RateLimit(RateLimit) => "rate_limits", |e| e.name.clone();
    StatefulSession(StatefulSession) => "stateful_sessions", |e| e.id.to_string();
    Listener(Listener) => "listeners", |e| e.id.to_string();
    WasmFilter(WasmFilter) => "wasm_filters", |e| e.id.to_string();
    ListenerWasmFilter(ListenerWasmFilter) => "listeners_wasm_filters",
        |e| format!("{}/{}", e.listener_id, e.wasm_filter_id);
    ExtAuthzFilter(ExtAuthzFilter) => "ext_authz_filters", |e| e.name.clone();
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table::from(name.as_str())
    }
}

impl From<Table> for String {
    fn from(table: Table) -> Self {
        table.as_str().to_string()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::ClusterId;

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::KNOWN {
            assert_eq!(&Table::from(table.as_str()), table);
        }
        assert_eq!(Table::KNOWN.len(), 26);
    }

    #[test]
    fn test_unknown_table_keeps_name() {
        let table = Table::from("quotas");
        assert_eq!(table, Table::Unknown("quotas".to_string()));
        assert_eq!(table.to_string(), "quotas");
    }

    #[test]
    fn test_table_serializes_as_name() {
        let json = serde_json::to_string(&Table::HeaderMatcher).unwrap();
        assert_eq!(json, "\"header_matchers\"");

        let table: Table = serde_json::from_str("\"routes\"").unwrap();
        assert_eq!(table, Table::Route);
    }

    #[test]
    fn test_entity_table_and_key() {
        let entity = Entity::from(ClusterNodeGroup {
            cluster_id: ClusterId::new(5),
            node_group: "ng1".to_string(),
        });
        assert_eq!(entity.table(), Table::ClusterNodeGroup);
        assert_eq!(entity.primary_key(), "5/ng1");
        assert!(ClusterNodeGroup::from_entity(&entity).is_some());
        assert!(Cluster::from_entity(&entity).is_none());
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("cluster".parse::<ResourceKind>().unwrap(), ResourceKind::Cluster);
        assert_eq!(
            "RouteConfiguration".parse::<ResourceKind>().unwrap(),
            ResourceKind::RouteConfiguration
        );
        assert!("secret".parse::<ResourceKind>().is_err());
    }
}
